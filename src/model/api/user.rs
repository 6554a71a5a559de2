use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    db::{
        profile::UserProfile,
        user::{NewUser, User},
    },
    mongodb::Id,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw login credentials, received from a user. These are never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// A request to create a user.
#[derive(Clone, Deserialize, Serialize)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Hash a password with a fresh random salt, enforcing the minimum length.
pub fn hash_password(password: &str) -> Result<String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Config::default(),
    )?)
}

impl TryFrom<UserCredentials> for NewUser {
    type Error = Error;

    /// Convert [`UserCredentials`] to a new [`User`] by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: UserCredentials) -> Result<Self> {
        if cred.username.trim().is_empty() {
            return Err(Error::bad_request("Username must not be empty"));
        }
        Ok(Self {
            password_hash: hash_password(&cred.password)?,
            username: cred.username,
            is_superuser: cred.is_superuser,
        })
    }
}

/// An API-friendly user description, without the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    pub id: ApiId,
    pub username: String,
    pub is_superuser: bool,
    pub node: Option<ApiId>,
}

impl UserDescription {
    pub fn new(user: User, profile: Option<&UserProfile>) -> Self {
        Self {
            id: user.id.into(),
            username: user.user.username,
            is_superuser: user.user.is_superuser,
            node: profile.and_then(|p| p.node).map(ApiId::from),
        }
    }
}

/// The node to assign a user to; `None` removes them from any node.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileSpec {
    pub node: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDescription {
    pub user_id: ApiId,
    pub node: Option<ApiId>,
}

impl From<UserProfile> for ProfileDescription {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id.into(),
            node: profile.node.map(ApiId::from),
        }
    }
}
