use std::fmt::Display;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite},
    time::Duration,
};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::config::Config;
use crate::error::Error;
use crate::model::{db::user::User, mongodb::Id};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Staff = 0,
    Superuser = 1,
}

impl Rights {
    /// The rights a user currently holds.
    pub fn of(user: &User) -> Self {
        if user.is_superuser {
            Self::Superuser
        } else {
            Self::Staff
        }
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Staff => "staff",
                Self::Superuser => "superuser",
            }
        )
    }
}

/// An authentication token representing a specific user with specific rights.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user, with their current rights.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            rights: Rights::of(user),
        }
    }

    /// Does this token still match the user's rights? Tokens issued before a
    /// promotion or demotion are rejected.
    pub fn matches(&self, user: &User) -> bool {
        self.id == user.id && self.rights == Rights::of(user)
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::db::user::UserCore;

    #[test]
    fn cookie_round_trip_keeps_identity() {
        let config = Config::example();
        let user = User {
            id: Id::new(),
            user: UserCore {
                username: "someone".to_string(),
                password_hash: String::new(),
                is_superuser: true,
            },
        };
        let cookie = AuthToken::new(&user).into_cookie(&config);
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));

        let decoded = AuthToken::from_cookie(&cookie, &config).unwrap();
        assert!(decoded.matches(&user));
        assert_eq!(decoded.rights, Rights::Superuser);
    }

    #[test]
    fn demoted_users_tokens_no_longer_match() {
        let mut user = User {
            id: Id::new(),
            user: UserCore {
                username: "someone".to_string(),
                password_hash: String::new(),
                is_superuser: true,
            },
        };
        let token = AuthToken::new(&user);
        user.is_superuser = false;
        assert!(!token.matches(&user));
    }
}
