//! Delivery events published to participant channels.
//!
//! All events share one envelope so subscribers can dispatch on `type`
//! without per-event parsing rules:
//!
//! ```json
//! {
//!     "type": "message.new",
//!     "timestamp": "2025-10-26T10:30:00Z",
//!     "data": { ... }
//! }
//! ```

use crate::models::identity::IdentityRef;
use crate::models::message::Message;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

/// Events announced by the delivery publisher. Each variant carries only the
/// data its subscribers need; envelope assembly is centralized in
/// [`broadcast_payload`].
#[derive(Debug, Clone)]
pub enum DeliveryEvent {
    /// New message persisted for the receiver.
    MessageNew { message: Message },

    /// The receiver marked the sender's messages seen.
    MessagesSeen { by: IdentityRef, flipped: u64 },

    /// A single message removed by its sender.
    MessageDeleted { message_id: Uuid, by: IdentityRef },

    /// Entire conversation removed by one side.
    ConversationDeleted { by: IdentityRef, removed: u64 },
}

impl DeliveryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryEvent::MessageNew { .. } => "message.new",
            DeliveryEvent::MessagesSeen { .. } => "messages.seen",
            DeliveryEvent::MessageDeleted { .. } => "message.deleted",
            DeliveryEvent::ConversationDeleted { .. } => "conversation.deleted",
        }
    }

    pub fn data(&self) -> serde_json::Value {
        match self {
            DeliveryEvent::MessageNew { message } => json!({
                "id": message.id,
                "from": message.sender.uid(),
                "to": message.receiver.uid(),
                "room_id": message.room_id,
                "body": message.body,
                "attachment": message.attachment,
                "created_at": message.created_at.to_rfc3339(),
            }),
            DeliveryEvent::MessagesSeen { by, flipped } => json!({
                "by": by.uid(),
                "flipped": flipped,
            }),
            DeliveryEvent::MessageDeleted { message_id, by } => json!({
                "message_id": message_id,
                "by": by.uid(),
            }),
            DeliveryEvent::ConversationDeleted { by, removed } => json!({
                "by": by.uid(),
                "removed": removed,
            }),
        }
    }
}

/// Wraps an event payload in the unified broadcast envelope.
pub fn broadcast_payload(event: &str, data: &serde_json::Value) -> serde_json::Value {
    json!({
        "type": event,
        "timestamp": Utc::now().to_rfc3339(),
        "data": data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_has_type_timestamp_and_data() {
        let payload = broadcast_payload("message.new", &json!({"id": 1}));
        assert_eq!(payload["type"], "message.new");
        assert!(payload["timestamp"].is_string());
        assert_eq!(payload["data"]["id"], 1);
    }

    #[test]
    fn seen_event_names_and_counts() {
        let event = DeliveryEvent::MessagesSeen {
            by: IdentityRef::new("user", 3),
            flipped: 4,
        };
        assert_eq!(event.name(), "messages.seen");
        assert_eq!(event.data()["by"], "user#3");
        assert_eq!(event.data()["flipped"], 4);
    }
}
