use crate::error::AppResult;
use crate::models::identity::IdentityRef;
use async_trait::async_trait;
use serde::Serialize;

/// Display profile for a participant, as resolved by the owning system.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub name: String,
    pub avatar_url: Option<String>,
}

/// External identity-lookup collaborator. Consumed only by the listing
/// operations; the stores themselves never need profile data.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve(&self, who: &IdentityRef) -> AppResult<Option<Profile>>;
}
