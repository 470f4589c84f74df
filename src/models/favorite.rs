use crate::models::identity::IdentityRef;
use crate::profile::Profile;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Favorite {
    pub id: Uuid,
    pub owner: IdentityRef,
    pub target: IdentityRef,
    pub created_at: DateTime<Utc>,
}

/// Favorite listing entry with the target's resolved profile. The store only
/// keeps reference pairs; profile data comes from the external resolver.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteContact {
    pub target: IdentityRef,
    pub profile: Option<Profile>,
}
