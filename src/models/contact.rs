use crate::models::identity::IdentityRef;
use crate::models::message::Message;
use crate::profile::Profile;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Derived conversation-partner summary. Never persisted; recomputed on
/// demand from the message store.
#[derive(Debug, Clone, Serialize)]
pub struct ContactSummary {
    pub partner: IdentityRef,
    pub last_message_at: DateTime<Utc>,
    pub unseen_count: i64,
}

/// Contact-list entry enriched for display: summary plus the partner's
/// resolved profile and the latest message either way.
#[derive(Debug, Clone, Serialize)]
pub struct ContactCard {
    pub summary: ContactSummary,
    pub profile: Option<Profile>,
    pub last_message: Option<Message>,
}
