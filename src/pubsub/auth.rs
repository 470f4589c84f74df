use crate::error::{AppError, AppResult};
use crate::models::identity::IdentityRef;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signed grant returned to a subscriber that may join a private channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelGrant {
    /// `app_key:signature` over `socket_id:channel:channel_data`.
    pub auth: String,
    pub channel_data: String,
}

/// Signs channel-access grants for private participant channels.
///
/// Two distinct failures, kept apart on purpose: a request with no
/// authenticated session is `Forbidden`, a session that does not match the
/// requested identity (by kind or id) is `Unauthorized`.
pub struct ChannelAuth {
    app_key: String,
    secret: Vec<u8>,
}

impl ChannelAuth {
    pub fn new(app_key: impl Into<String>, secret: impl AsRef<[u8]>) -> Self {
        Self {
            app_key: app_key.into(),
            secret: secret.as_ref().to_vec(),
        }
    }

    pub fn authorize(
        &self,
        session: Option<&IdentityRef>,
        requester: &IdentityRef,
        display_name: Option<&str>,
        channel: &str,
        socket_id: &str,
    ) -> AppResult<ChannelGrant> {
        let session = session.ok_or(AppError::Forbidden)?;
        if session != requester {
            return Err(AppError::Unauthorized);
        }

        let channel_data = json!({
            "user_id": session.uid(),
            "user_info": { "name": display_name },
        })
        .to_string();

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| AppError::Config("channel auth secret is empty".into()))?;
        mac.update(format!("{}:{}:{}", socket_id, channel, channel_data).as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(ChannelGrant {
            auth: format!("{}:{}", self.app_key, signature),
            channel_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> ChannelAuth {
        ChannelAuth::new("key", "secret")
    }

    #[test]
    fn missing_session_is_forbidden() {
        let me = IdentityRef::new("user", 1);
        let err = auth()
            .authorize(None, &me, None, "private-messenger.user#1", "1.1")
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn identity_mismatch_is_unauthorized() {
        let me = IdentityRef::new("user", 1);
        let other = IdentityRef::new("user", 2);
        let err = auth()
            .authorize(Some(&other), &me, None, "private-messenger.user#1", "1.1")
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        // Same id under a different kind must not pass either.
        let same_id_other_kind = IdentityRef::new("bot", 1);
        let err = auth()
            .authorize(
                Some(&same_id_other_kind),
                &me,
                None,
                "private-messenger.user#1",
                "1.1",
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn grant_is_deterministic_for_identical_input() {
        let me = IdentityRef::new("user", 1);
        let a = auth()
            .authorize(Some(&me), &me, Some("Alice"), "private-messenger.user#1", "1.1")
            .unwrap();
        let b = auth()
            .authorize(Some(&me), &me, Some("Alice"), "private-messenger.user#1", "1.1")
            .unwrap();
        assert_eq!(a.auth, b.auth);
        assert!(a.auth.starts_with("key:"));
        assert!(a.channel_data.contains("user#1"));
    }

    #[test]
    fn signature_covers_socket_and_channel() {
        let me = IdentityRef::new("user", 1);
        let a = auth()
            .authorize(Some(&me), &me, None, "private-messenger.user#1", "1.1")
            .unwrap();
        let b = auth()
            .authorize(Some(&me), &me, None, "private-messenger.user#1", "2.2")
            .unwrap();
        assert_ne!(a.auth, b.auth);
    }
}
