use chrono::Utc;
use log::info;
use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{
                reset::{check_token, decode_uid, NewPassword},
                AuthToken, AUTH_TOKEN_COOKIE,
            },
            user::{hash_password, LoginCredentials, UserDescription},
        },
        db::{profile::UserProfile, user::User},
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![login, logout, reset_password]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginCredentials>,
    users: Coll<User>,
    profiles: Coll<UserProfile>,
    config: &State<Config>,
) -> Result<Json<UserDescription>> {
    let with_username = doc! {
        "username": &credentials.username
    };

    let user = users
        .find_one(with_username, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No user found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&user);
    cookies.add(token.into_cookie(config));

    let profile = profiles.find_one(doc! { "user_id": user.id }, None).await?;
    Ok(Json(UserDescription::new(user, profile.as_ref())))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

/// Set a new password using a reset link. Changing the password invalidates
/// the link.
#[post("/auth/reset/<uid>/<token>", data = "<new_password>", format = "json")]
pub async fn reset_password(
    uid: &str,
    token: &str,
    new_password: Json<NewPassword>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<()> {
    let invalid = || Error::bad_request("Invalid or expired password reset link");

    let user_id = decode_uid(uid).ok_or_else(invalid)?;
    let user = users
        .find_one(user_id.as_doc(), None)
        .await?
        .ok_or_else(invalid)?;
    if !check_token(&user, token, Utc::now(), config) {
        return Err(invalid());
    }

    let password_hash = hash_password(&new_password.password)?;
    users
        .update_one(
            user.id.as_doc(),
            doc! { "$set": { "password_hash": password_hash } },
            None,
        )
        .await?;
    info!("Password reset for user '{}'", user.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{http::ContentType, local::asynchronous::Client, serde::json::serde_json::json};

    use crate::model::{
        api::{auth::reset::ResetLink, user::UserCredentials},
        db::user::NewUser,
    };

    use super::*;

    #[backend_test]
    async fn login_valid(client: Client, new_users: Coll<NewUser>) {
        new_users
            .insert_one(NewUser::try_from(UserCredentials::example_staff()).unwrap(), None)
            .await
            .unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(UserCredentials::example_staff().login()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let user: UserDescription = response.into_json().await.unwrap();
        assert_eq!(user.username, UserCredentials::example_staff().username);
        assert!(!user.is_superuser);
        assert_eq!(user.node, None);
    }

    #[backend_test]
    async fn login_invalid(client: Client, new_users: Coll<NewUser>) {
        new_users
            .insert_one(NewUser::try_from(UserCredentials::example_staff()).unwrap(), None)
            .await
            .unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": UserCredentials::example_staff().username,
                    "password": "not the password",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(UserCredentials::example_other_staff().login()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(staff)]
    async fn logout_removes_cookie(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn reset_link_works_once(client: Client, db: Database, new_users: Coll<NewUser>) {
        new_users
            .insert_one(NewUser::try_from(UserCredentials::example_staff()).unwrap(), None)
            .await
            .unwrap();
        let users = Coll::<User>::from_db(&db);
        let user = users
            .find_one(doc! { "username": UserCredentials::example_staff().username }, None)
            .await
            .unwrap()
            .unwrap();
        let config = client.rocket().state::<Config>().unwrap();
        let link = ResetLink::new(&user, config);

        let reset = |password: &str| {
            client
                .post(link.url.clone())
                .header(ContentType::JSON)
                .body(json!({ "password": password }).to_string())
                .dispatch()
        };

        // Too short.
        assert_eq!(Status::BadRequest, reset("short").await.status());

        assert_eq!(Status::Ok, reset("a brand new password").await.status());
        let user = users.find_one(user.id.as_doc(), None).await.unwrap().unwrap();
        assert!(user.verify_password("a brand new password"));

        // The password hash changed, so the link is spent.
        assert_eq!(Status::BadRequest, reset("yet another password").await.status());

        // Garbage links are rejected.
        let response = client
            .post(uri!(reset_password("nonsense", "1-abc")))
            .header(ContentType::JSON)
            .body(json!({ "password": "whatever12345" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }
}
