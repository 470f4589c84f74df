use crate::models::identity::IdentityRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Byte limit on a message body, matching the column width.
pub const MAX_BODY_BYTES: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConversationType {
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "group")]
    Group,
}

impl Default for ConversationType {
    fn default() -> Self {
        ConversationType::Direct
    }
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Direct => "direct",
            ConversationType::Group => "group",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "group" => ConversationType::Group,
            _ => ConversationType::Direct,
        }
    }
}

/// Attachment metadata stored alongside the message row. `stored_name` keys
/// the blob in external storage; `original_name` is the client-supplied name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub stored_name: String,
    pub original_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_type: ConversationType,
    pub sender: IdentityRef,
    pub receiver: IdentityRef,
    pub room_id: Option<i64>,
    pub body: String,
    pub attachment: Option<AttachmentMeta>,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a new message. `seen` is never caller-controlled.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_type: ConversationType,
    pub sender: IdentityRef,
    pub receiver: IdentityRef,
    pub room_id: Option<i64>,
    pub body: String,
    pub attachment: Option<AttachmentMeta>,
}
