use std::ops::{Deref, DerefMut};

use log::warn;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::user::UserCredentials,
    mongodb::{Coll, Id},
};

pub const DEFAULT_SUPERUSER_USERNAME: &str = "admin";
pub const DEFAULT_SUPERUSER_PASSWORD: &str = "change-this-password";

/// Core user data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub password_hash: String,
    /// Superusers bypass node scoping entirely.
    #[serde(default)]
    pub is_superuser: bool,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match anything.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Ensure at least one superuser exists, creating the default one if not.
///
/// The default credentials must be changed after first login.
pub async fn ensure_superuser_exists(users: &Coll<NewUser>) -> crate::error::Result<()> {
    let existing = users
        .find_one(doc! { "is_superuser": true }, None)
        .await?;
    if existing.is_none() {
        warn!(
            "No superuser found, creating default superuser '{}'",
            DEFAULT_SUPERUSER_USERNAME
        );
        let credentials = UserCredentials {
            username: DEFAULT_SUPERUSER_USERNAME.to_string(),
            password: DEFAULT_SUPERUSER_PASSWORD.to_string(),
            is_superuser: true,
        };
        let user = NewUser::try_from(credentials)?;
        users.insert_one(user, None).await?;
    }
    Ok(())
}
