use crate::error::{AppError, AppResult};
use crate::models::identity::IdentityRef;
use crate::models::message::{
    AttachmentMeta, ConversationType, Message, NewMessage, MAX_BODY_BYTES,
};
use crate::models::{page_offset, Paginated};
use crate::storage::uploads::AttachmentPolicy;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

/// Outcome of a conversation purge. `removed` counts rows actually deleted;
/// `attachments` are the blob references of those rows, for the caller to
/// purge from storage.
#[derive(Debug, Default)]
pub struct ConversationPurge {
    pub removed: u64,
    pub attachments: Vec<AttachmentMeta>,
}

/// What a single-message delete removed: the receiver (so the caller can
/// announce the removal) and the attachment reference to purge, if any.
#[derive(Debug)]
pub struct DeletedMessage {
    pub receiver: IdentityRef,
    pub attachment: Option<AttachmentMeta>,
}

const CONVERSATION_PREDICATE: &str = "((from_kind = $1 AND from_id = $2 AND to_kind = $3 AND to_id = $4) \
     OR (from_kind = $3 AND from_id = $4 AND to_kind = $1 AND to_id = $2))";

pub struct MessageService;

impl MessageService {
    /// Persist a new message between `sender` and `receiver`.
    ///
    /// Rejects sender == receiver, an empty body with no attachment, and
    /// bodies over the 5000-byte column limit. `seen` always starts false.
    pub async fn send(db: &Pool<Postgres>, new: NewMessage) -> AppResult<Message> {
        if new.sender == new.receiver {
            return Err(AppError::BadRequest(
                "sender and receiver must differ".into(),
            ));
        }
        if new.body.is_empty() && new.attachment.is_none() {
            return Err(AppError::BadRequest(
                "message body or attachment required".into(),
            ));
        }
        if new.body.len() > MAX_BODY_BYTES {
            return Err(AppError::BadRequest(format!(
                "message body exceeds {} bytes",
                MAX_BODY_BYTES
            )));
        }

        let id = Uuid::new_v4();
        // created_at comes from the database so the returned value matches
        // what later reads will see (timestamptz is microsecond precision).
        let row = sqlx::query(
            "INSERT INTO messages (id, conversation_type, from_kind, from_id, to_kind, to_id, room_id, body, attachment, seen) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE) \
             RETURNING created_at",
        )
        .bind(id)
        .bind(new.conversation_type.as_str())
        .bind(&new.sender.kind)
        .bind(new.sender.id)
        .bind(&new.receiver.kind)
        .bind(new.receiver.id)
        .bind(new.room_id)
        .bind(&new.body)
        .bind(new.attachment.as_ref().map(Json))
        .fetch_one(db)
        .await?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Message {
            id,
            conversation_type: new.conversation_type,
            sender: new.sender,
            receiver: new.receiver,
            room_id: new.room_id,
            body: new.body,
            attachment: new.attachment,
            seen: false,
            created_at,
        })
    }

    /// Fetch one page of the conversation between `me` and `other`, most
    /// recent first. Pages are 1-based.
    pub async fn fetch_conversation(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        other: &IdentityRef,
        page: i64,
        per_page: i64,
    ) -> AppResult<Paginated<Message>> {
        let per_page = per_page.clamp(1, 200);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM messages WHERE {}",
            CONVERSATION_PREDICATE
        ))
        .bind(&me.kind)
        .bind(me.id)
        .bind(&other.kind)
        .bind(other.id)
        .fetch_one(db)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT id, conversation_type, from_kind, from_id, to_kind, to_id, room_id, body, attachment, seen, created_at \
             FROM messages WHERE {} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $5 OFFSET $6",
            CONVERSATION_PREDICATE
        ))
        .bind(&me.kind)
        .bind(me.id)
        .bind(&other.kind)
        .bind(other.id)
        .bind(per_page)
        .bind(page_offset(page, per_page))
        .fetch_all(db)
        .await?;

        let items = rows.iter().map(message_from_row).collect::<Result<_, _>>()?;
        Ok(Paginated::new(items, total, per_page))
    }

    /// Latest message exchanged with `other`, in either direction.
    pub async fn last_message(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        other: &IdentityRef,
    ) -> AppResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT id, conversation_type, from_kind, from_id, to_kind, to_id, room_id, body, attachment, seen, created_at \
             FROM messages WHERE {} \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1",
            CONVERSATION_PREDICATE
        ))
        .bind(&me.kind)
        .bind(me.id)
        .bind(&other.kind)
        .bind(other.id)
        .fetch_optional(db)
        .await?;

        row.as_ref().map(message_from_row).transpose().map_err(Into::into)
    }

    /// Mark every unseen message from `other` to `me` as seen.
    ///
    /// One atomic UPDATE so concurrent calls for the same pair cannot lose
    /// writes. Idempotent; returns the number of rows flipped.
    pub async fn mark_seen(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        other: &IdentityRef,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET seen = TRUE \
             WHERE from_kind = $1 AND from_id = $2 AND to_kind = $3 AND to_id = $4 AND NOT seen",
        )
        .bind(&other.kind)
        .bind(other.id)
        .bind(&me.kind)
        .bind(me.id)
        .execute(db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count messages from `other` to `me` still unseen.
    pub async fn count_unseen(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        other: &IdentityRef,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             WHERE from_kind = $1 AND from_id = $2 AND to_kind = $3 AND to_id = $4 AND NOT seen",
        )
        .bind(&other.kind)
        .bind(other.id)
        .bind(&me.kind)
        .bind(me.id)
        .fetch_one(db)
        .await?;

        Ok(count)
    }

    /// Delete a message owned by `me`, returning its receiver and its
    /// attachment reference (if any) for the caller to purge from blob
    /// storage.
    ///
    /// The row is removed whether or not an attachment exists. Deleting a
    /// message that does not exist, or that `me` did not send, is NotFound.
    pub async fn delete_message(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        message_id: Uuid,
    ) -> AppResult<DeletedMessage> {
        let row = sqlx::query(
            "DELETE FROM messages WHERE id = $1 AND from_kind = $2 AND from_id = $3 \
             RETURNING to_kind, to_id, attachment",
        )
        .bind(message_id)
        .bind(&me.kind)
        .bind(me.id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        let attachment: Option<Json<AttachmentMeta>> = row.try_get("attachment")?;
        Ok(DeletedMessage {
            receiver: IdentityRef::new(row.try_get::<String, _>("to_kind")?, row.try_get("to_id")?),
            attachment: attachment.map(|a| a.0),
        })
    }

    /// Delete every message between `me` and `other`, best-effort.
    ///
    /// Rows are removed one at a time; a failed delete is logged and skipped
    /// rather than aborting the purge, and the returned count reflects rows
    /// actually removed. Attachment references are collected for the caller
    /// to purge from blob storage.
    pub async fn delete_conversation(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        other: &IdentityRef,
    ) -> AppResult<ConversationPurge> {
        let rows = sqlx::query(&format!(
            "SELECT id, attachment FROM messages WHERE {}",
            CONVERSATION_PREDICATE
        ))
        .bind(&me.kind)
        .bind(me.id)
        .bind(&other.kind)
        .bind(other.id)
        .fetch_all(db)
        .await?;

        let mut purge = ConversationPurge::default();
        for row in rows {
            let id: Uuid = row.get("id");
            let attachment: Option<Json<AttachmentMeta>> = row.try_get("attachment")?;
            match sqlx::query("DELETE FROM messages WHERE id = $1")
                .bind(id)
                .execute(db)
                .await
            {
                Ok(result) => {
                    if result.rows_affected() > 0 {
                        purge.removed += result.rows_affected();
                        if let Some(a) = attachment {
                            purge.attachments.push(a.0);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "conversation purge: delete failed, continuing");
                }
            }
        }

        Ok(purge)
    }

    /// Stored names of image attachments shared in the conversation, newest
    /// first. Extension membership in `policy` decides what counts as an
    /// image.
    pub async fn shared_photos(
        db: &Pool<Postgres>,
        me: &IdentityRef,
        other: &IdentityRef,
        policy: &AttachmentPolicy,
    ) -> AppResult<Vec<String>> {
        let rows = sqlx::query(&format!(
            "SELECT attachment FROM messages WHERE {} AND attachment IS NOT NULL \
             ORDER BY created_at DESC",
            CONVERSATION_PREDICATE
        ))
        .bind(&me.kind)
        .bind(me.id)
        .bind(&other.kind)
        .bind(other.id)
        .fetch_all(db)
        .await?;

        let mut images = Vec::new();
        for row in rows {
            let attachment: Option<Json<AttachmentMeta>> = row.try_get("attachment")?;
            if let Some(a) = attachment {
                if policy.is_image(&a.0.stored_name) {
                    images.push(a.0.stored_name);
                }
            }
        }
        Ok(images)
    }
}

fn message_from_row(row: &PgRow) -> Result<Message, sqlx::Error> {
    let conversation_type: String = row.try_get("conversation_type")?;
    let attachment: Option<Json<AttachmentMeta>> = row.try_get("attachment")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(Message {
        id: row.try_get("id")?,
        conversation_type: ConversationType::from_str(&conversation_type),
        sender: IdentityRef::new(row.try_get::<String, _>("from_kind")?, row.try_get("from_id")?),
        receiver: IdentityRef::new(row.try_get::<String, _>("to_kind")?, row.try_get("to_id")?),
        room_id: row.try_get("room_id")?,
        body: row.try_get("body")?,
        attachment: attachment.map(|a| a.0),
        seen: row.try_get("seen")?,
        created_at,
    })
}
