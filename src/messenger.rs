use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::contact::ContactCard;
use crate::models::favorite::FavoriteContact;
use crate::models::identity::IdentityRef;
use crate::models::message::{AttachmentMeta, ConversationType, Message, NewMessage};
use crate::models::Paginated;
use crate::profile::ProfileResolver;
use crate::pubsub::auth::{ChannelAuth, ChannelGrant};
use crate::pubsub::events::DeliveryEvent;
use crate::pubsub::{channel_for, EventPublisher};
use crate::services::contact_service::ContactService;
use crate::services::favorite_service::FavoriteService;
use crate::services::message_service::{ConversationPurge, MessageService};
use crate::storage::uploads::AttachmentPolicy;
use crate::storage::BlobStorage;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

/// Raw upload accompanying a send.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub conversation_type: ConversationType,
    pub sender: IdentityRef,
    pub receiver: IdentityRef,
    pub room_id: Option<i64>,
    pub body: String,
    pub file: Option<UploadedFile>,
}

/// Ties the stores, the delivery publisher, blob storage, and profile
/// resolution together behind one handle. The stores stay callable on their
/// own; this type owns the cross-cutting flows (upload-then-persist-then-
/// publish, row-delete-then-blob-purge).
pub struct Messenger {
    db: Pool<Postgres>,
    publisher: Arc<dyn EventPublisher>,
    storage: Arc<dyn BlobStorage>,
    profiles: Arc<dyn ProfileResolver>,
    channel_auth: ChannelAuth,
    policy: AttachmentPolicy,
    attachments_folder: String,
    per_page: i64,
}

impl Messenger {
    pub fn new(
        db: Pool<Postgres>,
        publisher: Arc<dyn EventPublisher>,
        storage: Arc<dyn BlobStorage>,
        profiles: Arc<dyn ProfileResolver>,
        config: &Config,
    ) -> Self {
        Self {
            db,
            publisher,
            storage,
            profiles,
            channel_auth: ChannelAuth::new(config.app_key.as_str(), config.app_secret.as_bytes()),
            policy: AttachmentPolicy::from_config(config),
            attachments_folder: config.attachments_folder.clone(),
            per_page: config.per_page,
        }
    }

    pub fn db(&self) -> &Pool<Postgres> {
        &self.db
    }

    fn attachment_path(&self, stored_name: &str) -> String {
        format!("{}/{}", self.attachments_folder, stored_name)
    }

    /// Fire-and-forget push to the channel scoped to `target`. Failures are
    /// logged and swallowed; persistence never depends on a publish.
    pub async fn publish_message(
        &self,
        target: &IdentityRef,
        event: &str,
        payload: &serde_json::Value,
    ) {
        if let Err(e) = self
            .publisher
            .trigger(&channel_for(target), event, payload)
            .await
        {
            tracing::warn!(channel = %channel_for(target), event, error = %e, "delivery publish failed");
        }
    }

    async fn publish(&self, target: &IdentityRef, event: DeliveryEvent) {
        self.publish_message(target, event.name(), &event.data())
            .await;
    }

    /// Best-effort blob purge after a row delete. A crash or failure here
    /// leaves an orphaned blob, which is an accepted leak.
    async fn purge_attachment(&self, attachment: &AttachmentMeta) {
        let path = self.attachment_path(&attachment.stored_name);
        match self.storage.exists(&path).await {
            Ok(true) => {
                if let Err(e) = self.storage.delete(&path).await {
                    tracing::warn!(path = %path, error = %e, "attachment purge failed");
                }
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "attachment existence check failed");
            }
        }
    }

    /// Validate and store the upload (if any), persist the message, then
    /// announce it on the receiver's channel.
    ///
    /// A rejected or failed upload aborts the send; a failed publish does
    /// not, and never rolls back the persisted row.
    pub async fn send(&self, req: SendRequest) -> AppResult<Message> {
        let attachment = match req.file {
            Some(file) => {
                let stored_name = self
                    .policy
                    .validate(&file.original_name, file.bytes.len() as u64)?;
                self.storage
                    .store(&self.attachment_path(&stored_name), file.bytes)
                    .await?;
                Some(AttachmentMeta {
                    stored_name,
                    original_name: file.original_name,
                })
            }
            None => None,
        };

        let message = MessageService::send(
            &self.db,
            NewMessage {
                conversation_type: req.conversation_type,
                sender: req.sender,
                receiver: req.receiver,
                room_id: req.room_id,
                body: req.body,
                attachment,
            },
        )
        .await?;

        let receiver = message.receiver.clone();
        self.publish(
            &receiver,
            DeliveryEvent::MessageNew {
                message: message.clone(),
            },
        )
        .await;

        Ok(message)
    }

    pub async fn conversation(
        &self,
        me: &IdentityRef,
        other: &IdentityRef,
        page: i64,
    ) -> AppResult<Paginated<Message>> {
        MessageService::fetch_conversation(&self.db, me, other, page, self.per_page).await
    }

    /// Flip unseen messages from `other` and tell them about it.
    pub async fn mark_seen(&self, me: &IdentityRef, other: &IdentityRef) -> AppResult<u64> {
        let flipped = MessageService::mark_seen(&self.db, me, other).await?;
        if flipped > 0 {
            self.publish(
                other,
                DeliveryEvent::MessagesSeen {
                    by: me.clone(),
                    flipped,
                },
            )
            .await;
        }
        Ok(flipped)
    }

    pub async fn unseen_count(&self, me: &IdentityRef, other: &IdentityRef) -> AppResult<i64> {
        MessageService::count_unseen(&self.db, me, other).await
    }

    /// Delete one of `me`'s messages, purge its blob, and notify the
    /// receiver.
    pub async fn delete_message(&self, me: &IdentityRef, message_id: Uuid) -> AppResult<()> {
        let deleted = MessageService::delete_message(&self.db, me, message_id).await?;
        if let Some(attachment) = &deleted.attachment {
            self.purge_attachment(attachment).await;
        }
        self.publish(
            &deleted.receiver,
            DeliveryEvent::MessageDeleted {
                message_id,
                by: me.clone(),
            },
        )
        .await;
        Ok(())
    }

    /// Delete the whole conversation with `other`, purge the blobs of the
    /// removed rows, and notify `other`.
    pub async fn delete_conversation(
        &self,
        me: &IdentityRef,
        other: &IdentityRef,
    ) -> AppResult<ConversationPurge> {
        let purge = MessageService::delete_conversation(&self.db, me, other).await?;
        for attachment in &purge.attachments {
            self.purge_attachment(attachment).await;
        }
        if purge.removed > 0 {
            self.publish(
                other,
                DeliveryEvent::ConversationDeleted {
                    by: me.clone(),
                    removed: purge.removed,
                },
            )
            .await;
        }
        Ok(purge)
    }

    /// One page of conversation partners, enriched with profiles and last
    /// messages for display.
    pub async fn contacts(
        &self,
        me: &IdentityRef,
        page: i64,
    ) -> AppResult<Paginated<ContactCard>> {
        let summaries = ContactService::list_contacts(&self.db, me, page, self.per_page).await?;

        let mut items = Vec::with_capacity(summaries.items.len());
        for summary in summaries.items {
            let profile = self.profiles.resolve(&summary.partner).await?;
            let last_message = MessageService::last_message(&self.db, me, &summary.partner).await?;
            items.push(ContactCard {
                summary,
                profile,
                last_message,
            });
        }

        Ok(Paginated {
            items,
            total: summaries.total,
            last_page: summaries.last_page,
        })
    }

    pub async fn favorites(&self, me: &IdentityRef) -> AppResult<Vec<FavoriteContact>> {
        let favorites = FavoriteService::list_favorites(&self.db, me).await?;
        let mut contacts = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            let profile = self.profiles.resolve(&favorite.target).await?;
            contacts.push(FavoriteContact {
                target: favorite.target,
                profile,
            });
        }
        Ok(contacts)
    }

    pub async fn is_favorite(&self, me: &IdentityRef, target: &IdentityRef) -> AppResult<bool> {
        FavoriteService::is_favorite(&self.db, me, target).await
    }

    pub async fn set_favorite(
        &self,
        me: &IdentityRef,
        target: &IdentityRef,
        desired: bool,
    ) -> AppResult<bool> {
        FavoriteService::set_favorite(&self.db, me, target, desired).await
    }

    /// Star/unstar flip; returns the new state.
    pub async fn toggle_favorite(&self, me: &IdentityRef, target: &IdentityRef) -> AppResult<bool> {
        let desired = !FavoriteService::is_favorite(&self.db, me, target).await?;
        FavoriteService::set_favorite(&self.db, me, target, desired).await?;
        Ok(desired)
    }

    pub async fn shared_photos(
        &self,
        me: &IdentityRef,
        other: &IdentityRef,
    ) -> AppResult<Vec<String>> {
        MessageService::shared_photos(&self.db, me, other, &self.policy).await
    }

    /// Resolve a download URL for a stored attachment; NotFound when the
    /// blob is missing or already purged.
    pub async fn attachment_url(&self, stored_name: &str) -> AppResult<String> {
        let path = self.attachment_path(stored_name);
        if !self.storage.exists(&path).await? {
            return Err(AppError::NotFound);
        }
        self.storage.url(&path).await
    }

    pub fn authorize_channel(
        &self,
        session: Option<&IdentityRef>,
        requester: &IdentityRef,
        display_name: Option<&str>,
        channel: &str,
        socket_id: &str,
    ) -> AppResult<ChannelGrant> {
        self.channel_auth
            .authorize(session, requester, display_name, channel, socket_id)
    }
}
