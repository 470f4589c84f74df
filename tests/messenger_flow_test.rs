mod common;

use common::{build_messenger, start_postgres, user, FailingPublisher, MemoryStorage, StaticResolver};
use messenger_core::error::AppError;
use messenger_core::messenger::{Messenger, SendRequest, UploadedFile};
use messenger_core::models::message::ConversationType;
use std::sync::Arc;
use testcontainers::clients::Cli;

fn send_text(from: i64, to: i64, body: &str) -> SendRequest {
    SendRequest {
        conversation_type: ConversationType::Direct,
        sender: user(from),
        receiver: user(to),
        room_id: None,
        body: body.into(),
        file: None,
    }
}

#[tokio::test]
async fn send_with_upload_stores_blob_and_announces_to_receiver() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    let mut req = send_text(1, 2, "see attached");
    req.file = Some(UploadedFile {
        original_name: "photo.png".into(),
        bytes: vec![0u8; 128],
    });
    let message = t.messenger.send(req).await.unwrap();

    let attachment = message.attachment.as_ref().unwrap();
    assert!(attachment.stored_name.ends_with(".png"));
    assert_eq!(attachment.original_name, "photo.png");

    let blobs = t.storage.blobs.lock().unwrap();
    assert!(blobs.contains_key(&format!("attachments/{}", attachment.stored_name)));
    drop(blobs);

    let events = t.publisher.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let (channel, event, payload) = &events[0];
    assert_eq!(channel, "private-messenger.user#2");
    assert_eq!(event, "message.new");
    assert_eq!(payload["from"], "user#1");
    assert_eq!(payload["body"], "see attached");
}

#[tokio::test]
async fn rejected_upload_aborts_the_send() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    let mut req = send_text(1, 2, "nope");
    req.file = Some(UploadedFile {
        original_name: "setup.exe".into(),
        bytes: vec![0u8; 16],
    });
    let err = t.messenger.send(req).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Nothing persisted, nothing stored, nothing published.
    let page = t.messenger.conversation(&user(1), &user(2), 1).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(t.storage.blobs.lock().unwrap().is_empty());
    assert!(t.publisher.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn message_is_persisted_even_when_publish_fails() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let messenger = Messenger::new(
        pool,
        Arc::new(FailingPublisher),
        Arc::new(MemoryStorage::default()),
        Arc::new(StaticResolver),
        &common::test_config(),
    );

    let message = messenger.send(send_text(1, 2, "durable")).await.unwrap();
    let page = messenger.conversation(&user(1), &user(2), 1).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, message.id);
}

#[tokio::test]
async fn deleting_a_message_purges_its_blob() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    let mut req = send_text(1, 2, "");
    req.file = Some(UploadedFile {
        original_name: "archive.zip".into(),
        bytes: vec![1u8; 64],
    });
    let message = t.messenger.send(req).await.unwrap();
    let stored = message.attachment.as_ref().unwrap().stored_name.clone();
    let path = format!("attachments/{}", stored);
    assert!(t.storage.blobs.lock().unwrap().contains_key(&path));

    t.messenger.delete_message(&user(1), message.id).await.unwrap();

    assert!(!t.storage.blobs.lock().unwrap().contains_key(&path));
    let page = t.messenger.conversation(&user(1), &user(2), 1).await.unwrap();
    assert_eq!(page.total, 0);

    let events = t.publisher.events.lock().unwrap();
    assert_eq!(events.last().unwrap().1, "message.deleted");
}

#[tokio::test]
async fn deleting_a_conversation_purges_blobs_and_notifies_the_peer() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    t.messenger.send(send_text(1, 2, "a")).await.unwrap();
    let mut req = send_text(2, 1, "");
    req.file = Some(UploadedFile {
        original_name: "notes.txt".into(),
        bytes: vec![2u8; 8],
    });
    t.messenger.send(req).await.unwrap();

    let purge = t.messenger.delete_conversation(&user(1), &user(2)).await.unwrap();
    assert_eq!(purge.removed, 2);
    assert_eq!(purge.attachments.len(), 1);
    assert!(t.storage.blobs.lock().unwrap().is_empty());

    let events = t.publisher.events.lock().unwrap();
    let (channel, event, _) = events.last().unwrap();
    assert_eq!(event, "conversation.deleted");
    assert_eq!(channel, "private-messenger.user#2");
}

#[tokio::test]
async fn mark_seen_notifies_the_original_sender_once() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    t.messenger.send(send_text(2, 1, "unread")).await.unwrap();
    assert_eq!(t.messenger.unseen_count(&user(1), &user(2)).await.unwrap(), 1);

    let flipped = t.messenger.mark_seen(&user(1), &user(2)).await.unwrap();
    assert_eq!(flipped, 1);

    // Second call flips nothing and publishes nothing new.
    let flipped = t.messenger.mark_seen(&user(1), &user(2)).await.unwrap();
    assert_eq!(flipped, 0);

    let events = t.publisher.events.lock().unwrap();
    let seen_events: Vec<_> = events.iter().filter(|e| e.1 == "messages.seen").collect();
    assert_eq!(seen_events.len(), 1);
    assert_eq!(seen_events[0].0, "private-messenger.user#2");
}

#[tokio::test]
async fn contacts_and_favorites_come_back_with_profiles() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    t.messenger.send(send_text(2, 1, "hello")).await.unwrap();
    t.messenger.send(send_text(1, 3, "hey")).await.unwrap();

    let contacts = t.messenger.contacts(&user(1), 1).await.unwrap();
    assert_eq!(contacts.total, 2);
    let card = &contacts.items[0];
    assert_eq!(card.summary.partner, user(3));
    assert_eq!(card.profile.as_ref().unwrap().name, "user 3");
    assert_eq!(card.last_message.as_ref().unwrap().body, "hey");

    assert!(t.messenger.toggle_favorite(&user(1), &user(2)).await.unwrap());
    let favorites = t.messenger.favorites(&user(1)).await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].target, user(2));
    assert_eq!(favorites[0].profile.as_ref().unwrap().name, "user 2");

    // Toggling again unstars.
    assert!(!t.messenger.toggle_favorite(&user(1), &user(2)).await.unwrap());
    assert!(t.messenger.favorites(&user(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn shared_photos_and_attachment_urls() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    let mut photo = send_text(1, 2, "");
    photo.file = Some(UploadedFile {
        original_name: "sunset.jpg".into(),
        bytes: vec![3u8; 32],
    });
    let photo_message = t.messenger.send(photo).await.unwrap();

    let mut archive = send_text(1, 2, "");
    archive.file = Some(UploadedFile {
        original_name: "bundle.zip".into(),
        bytes: vec![4u8; 32],
    });
    t.messenger.send(archive).await.unwrap();

    let photos = t.messenger.shared_photos(&user(2), &user(1)).await.unwrap();
    let stored = photo_message.attachment.as_ref().unwrap().stored_name.clone();
    assert_eq!(photos, vec![stored.clone()]);

    let url = t.messenger.attachment_url(&stored).await.unwrap();
    assert_eq!(url, format!("memory://attachments/{}", stored));

    let err = t.messenger.attachment_url("missing.png").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn channel_grants_enforce_the_identity_match() {
    let docker = Cli::default();
    let (_pg, pool) = start_postgres(&docker).await;
    let t = build_messenger(pool);

    let me = user(1);
    let channel = "private-messenger.user#1";

    let err = t
        .messenger
        .authorize_channel(None, &me, None, channel, "81.1")
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = t
        .messenger
        .authorize_channel(Some(&user(2)), &me, None, channel, "81.1")
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    let grant = t
        .messenger
        .authorize_channel(Some(&me), &me, Some("Alice"), channel, "81.1")
        .unwrap();
    assert!(grant.auth.starts_with("messenger:"));
    assert!(grant.channel_data.contains("user#1"));
    assert!(grant.channel_data.contains("Alice"));
}
