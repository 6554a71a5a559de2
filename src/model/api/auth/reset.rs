//! Password reset links.
//!
//! A link carries the user ID and a token `<timestamp>-<mac>`. The MAC covers
//! the user ID, the current password hash and the timestamp, so a token stops
//! working once it expires or the password changes.

use chrono::{DateTime, Utc};
use data_encoding::{BASE64URL_NOPAD, HEXLOWER};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::Config;
use crate::model::{db::user::User, mongodb::Id};

type HmacSha256 = Hmac<Sha256>;

/// Encode a user ID for use in a URL.
pub fn encode_uid(id: Id) -> String {
    BASE64URL_NOPAD.encode(id.to_hex().as_bytes())
}

/// Decode a user ID encoded by [`encode_uid`].
pub fn decode_uid(uidb64: &str) -> Option<Id> {
    let bytes = BASE64URL_NOPAD.decode(uidb64.as_bytes()).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}

fn mac(user: &User, timestamp: i64, config: &Config) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(config.reset_secret())
        .expect("HMAC can take key of any size");
    mac.update(user.id.bytes().as_slice());
    mac.update(user.password_hash.as_bytes());
    mac.update(&timestamp.to_le_bytes());
    mac
}

/// Create a reset token for the user at the given time.
pub fn make_token(user: &User, now: DateTime<Utc>, config: &Config) -> String {
    let timestamp = now.timestamp();
    let tag = mac(user, timestamp, config).finalize().into_bytes();
    format!("{timestamp}-{}", HEXLOWER.encode(&tag))
}

/// Check a reset token against the user's current state.
pub fn check_token(user: &User, token: &str, now: DateTime<Utc>, config: &Config) -> bool {
    let Some((timestamp, tag)) = token.split_once('-') else {
        return false;
    };
    let (Ok(timestamp), Ok(tag)) = (timestamp.parse::<i64>(), HEXLOWER.decode(tag.as_bytes()))
    else {
        return false;
    };
    if now.timestamp() - timestamp > config.reset_ttl().num_seconds() || timestamp > now.timestamp() {
        return false;
    }
    mac(user, timestamp, config).verify_slice(&tag).is_ok()
}

/// A ready-to-use password reset link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetLink {
    pub uid: String,
    pub token: String,
    pub url: String,
}

impl ResetLink {
    pub fn new(user: &User, config: &Config) -> Self {
        let uid = encode_uid(user.id);
        let token = make_token(user, Utc::now(), config);
        let url = format!("/auth/reset/{uid}/{token}");
        Self { uid, token, url }
    }
}

/// The new password submitted through a reset link.
#[derive(Clone, Deserialize, Serialize)]
pub struct NewPassword {
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::model::db::user::UserCore;

    fn user() -> User {
        User {
            id: Id::new(),
            user: UserCore {
                username: "someone".to_string(),
                password_hash: "$argon2i$original".to_string(),
                is_superuser: false,
            },
        }
    }

    #[test]
    fn uid_round_trip() {
        let id = Id::new();
        assert_eq!(decode_uid(&encode_uid(id)), Some(id));
        assert_eq!(decode_uid("not base64!"), None);
    }

    #[test]
    fn fresh_token_is_valid() {
        let config = Config::example();
        let user = user();
        let now = Utc::now();
        let token = make_token(&user, now, &config);
        assert!(check_token(&user, &token, now + Duration::minutes(5), &config));
    }

    #[test]
    fn token_expires() {
        let config = Config::example();
        let user = user();
        let now = Utc::now();
        let token = make_token(&user, now, &config);
        let later = now + config.reset_ttl() + Duration::seconds(1);
        assert!(!check_token(&user, &token, later, &config));
    }

    #[test]
    fn token_dies_with_password_change() {
        let config = Config::example();
        let mut user = user();
        let now = Utc::now();
        let token = make_token(&user, now, &config);
        user.password_hash = "$argon2i$changed".to_string();
        assert!(!check_token(&user, &token, now, &config));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let config = Config::example();
        let user = user();
        let now = Utc::now();
        assert!(!check_token(&user, "", now, &config));
        assert!(!check_token(&user, "123", now, &config));
        assert!(!check_token(&user, "abc-def", now, &config));
        let token = make_token(&user, now, &config);
        let forged = format!("{}-{}", now.timestamp() + 1, token.split_once('-').unwrap().1);
        assert!(!check_token(&user, &forged, now + Duration::seconds(2), &config));
    }
}
