use mongodb::{bson::doc, Database};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    common::access::Actor,
    db::{profile::UserProfile, user::User},
    mongodb::Coll,
};

use super::token::{AuthToken, AUTH_TOKEN_COOKIE};

/// Resolve the acting user from the auth cookie.
///
/// The user and their profile are re-read on every request, so node
/// reassignment takes effect immediately.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for Actor {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` and `Database` are always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();
        let db = req.guard::<&State<Database>>().await.unwrap();

        let unauthorized = |reason: &str| {
            Outcome::Failure((
                Status::Unauthorized,
                Error::Status(Status::Unauthorized, reason.to_string()),
            ))
        };

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => return unauthorized("Not logged in"),
        };
        let token = match AuthToken::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(_) => return unauthorized("Invalid or expired auth token"),
        };

        let user = match Coll::<User>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await
        {
            Ok(Some(user)) if token.matches(&user) => user,
            Ok(_) => return unauthorized("Auth token no longer valid"),
            Err(e) => return Outcome::Failure((Status::InternalServerError, e.into())),
        };

        let profile = match Coll::<UserProfile>::from_db(db)
            .find_one(doc! { "user_id": user.id }, None)
            .await
        {
            Ok(profile) => profile,
            Err(e) => return Outcome::Failure((Status::InternalServerError, e.into())),
        };

        Outcome::Success(Actor {
            id: user.id,
            username: user.user.username,
            is_superuser: user.user.is_superuser,
            node: profile.and_then(|profile| profile.node),
        })
    }
}
