pub mod auth;
pub mod events;

use crate::error::{AppError, AppResult};
use crate::models::identity::IdentityRef;
use async_trait::async_trait;
use redis::AsyncCommands;

const CHANNEL_PREFIX: &str = "private-messenger.";

/// Channel carrying delivery events for one participant.
pub fn channel_for(target: &IdentityRef) -> String {
    format!("{}{}", CHANNEL_PREFIX, target.uid())
}

/// Fire-and-forget fan-out to live subscribers. Implementations must not
/// guarantee delivery; callers persist first and treat a failed trigger as
/// log-and-continue.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn trigger(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> AppResult<()>;
}

pub struct RedisPublisher {
    client: redis::Client,
}

impl RedisPublisher {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn from_url(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url).map_err(|e| AppError::Publish(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for RedisPublisher {
    async fn trigger(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> AppResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Publish(e.to_string()))?;
        let envelope = events::broadcast_payload(event, payload).to_string();
        conn.publish::<_, _, ()>(channel, envelope)
            .await
            .map_err(|e| AppError::Publish(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_embeds_the_target_uid() {
        let target = IdentityRef::new("user", 9);
        assert_eq!(channel_for(&target), "private-messenger.user#9");
    }
}
