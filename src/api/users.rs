use mongodb::{
    bson::doc,
    options::{FindOptions, UpdateOptions},
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::reset::ResetLink,
            user::{ProfileDescription, ProfileSpec, UserCredentials, UserDescription},
        },
        common::access::Actor,
        db::{
            node::Node,
            profile::UserProfile,
            user::{NewUser, User},
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        list_users,
        create_user,
        delete_user,
        password_reset_link,
        list_profiles,
        set_profile,
    ]
}

#[get("/users")]
async fn list_users(
    actor: Actor,
    users: Coll<User>,
    profiles: Coll<UserProfile>,
) -> Result<Json<Vec<UserDescription>>> {
    actor.ensure_superuser()?;
    let options = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let users: Vec<User> = users.find(None, options).await?.try_collect().await?;
    let profiles: Vec<UserProfile> = profiles.find(None, None).await?.try_collect().await?;
    let descriptions = users
        .into_iter()
        .map(|user| {
            let profile = profiles.iter().find(|profile| profile.user_id == user.id);
            UserDescription::new(user, profile)
        })
        .collect();
    Ok(Json(descriptions))
}

#[post("/users", data = "<credentials>", format = "json")]
async fn create_user(
    actor: Actor,
    credentials: Json<UserCredentials>,
    new_users: Coll<NewUser>,
    users: Coll<User>,
) -> Result<Json<UserDescription>> {
    actor.ensure_superuser()?;
    let user = NewUser::try_from(credentials.0)?;
    let new_id: Id = new_users
        .insert_one(&user, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Inserted user has no ID"))?
        .into();
    let user = users
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {new_id}")))?;
    Ok(Json(UserDescription::new(user, None)))
}

#[delete("/users/<user_id>")]
async fn delete_user(
    actor: Actor,
    user_id: Id,
    users: Coll<User>,
    profiles: Coll<UserProfile>,
) -> Result<()> {
    actor.ensure_superuser()?;
    if user_id == actor.id {
        return Err(Error::bad_request("Cannot delete yourself"));
    }
    let result = users.delete_one(user_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("User {user_id}")));
    }
    profiles
        .delete_one(doc! { "user_id": user_id }, None)
        .await?;
    Ok(())
}

#[get("/users/<user_id>/password-reset-link")]
async fn password_reset_link(
    actor: Actor,
    user_id: Id,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<ResetLink>> {
    actor.ensure_superuser()?;
    let user = users
        .find_one(user_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    Ok(Json(ResetLink::new(&user, config)))
}

#[get("/profiles")]
async fn list_profiles(
    actor: Actor,
    profiles: Coll<UserProfile>,
) -> Result<Json<Vec<ProfileDescription>>> {
    actor.ensure_superuser()?;
    let profiles: Vec<UserProfile> = profiles.find(None, None).await?.try_collect().await?;
    Ok(Json(profiles.into_iter().map(Into::into).collect()))
}

/// Assign a user to a node, or remove them from any node.
#[put("/profiles/<user_id>", data = "<spec>", format = "json")]
async fn set_profile(
    actor: Actor,
    user_id: Id,
    spec: Json<ProfileSpec>,
    users: Coll<User>,
    nodes: Coll<Node>,
    profiles: Coll<UserProfile>,
) -> Result<Json<ProfileDescription>> {
    actor.ensure_superuser()?;
    if users.find_one(user_id.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("User {user_id}")));
    }
    if let Some(node) = spec.node {
        if nodes.find_one(node.as_doc(), None).await?.is_none() {
            return Err(Error::bad_request(format!("Unknown node {node}")));
        }
    }

    let upsert = UpdateOptions::builder().upsert(true).build();
    profiles
        .update_one(
            doc! { "user_id": user_id },
            doc! { "$set": { "node": spec.node } },
            upsert,
        )
        .await?;
    Ok(Json(
        UserProfile {
            user_id,
            node: spec.node,
        }
        .into(),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::model::{api::auth::reset::check_token, db::node::NewNode};

    use super::*;

    async fn create(client: &Client, credentials: &UserCredentials) -> UserDescription {
        let response = client
            .post(uri!(create_user))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    #[backend_test(superuser)]
    async fn create_list_delete_users(client: Client) {
        let created = create(&client, &UserCredentials::example_staff()).await;
        assert_eq!(created.username, UserCredentials::example_staff().username);

        let response = client.get(uri!(list_users)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let users: Vec<UserDescription> = response.into_json().await.unwrap();
        let names: Vec<_> = users.iter().map(|user| user.username.as_str()).collect();
        assert_eq!(names, ["coordinator", "node-manager"]);

        // Usernames are unique.
        let response = client
            .post(uri!(create_user))
            .header(ContentType::JSON)
            .body(json!(UserCredentials::example_staff()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client.delete(uri!(delete_user(*created.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client.delete(uri!(delete_user(*created.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(superuser)]
    async fn cannot_delete_self(client: Client) {
        let response = client.get(uri!(list_users)).dispatch().await;
        let users: Vec<UserDescription> = response.into_json().await.unwrap();
        let response = client.delete(uri!(delete_user(*users[0].id))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(staff)]
    async fn staff_cannot_manage_users(client: Client) {
        let response = client.get(uri!(list_users)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        let response = client
            .post(uri!(create_user))
            .header(ContentType::JSON)
            .body(json!(UserCredentials::example_other_staff()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn anonymous_users_are_unauthorized(client: Client) {
        let response = client.get(uri!(list_users)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(superuser)]
    async fn assign_node(client: Client, db: Database, new_nodes: Coll<NewNode>) {
        let user = create(&client, &UserCredentials::example_other_staff()).await;
        let node: Id = new_nodes
            .insert_one(NewNode::example_other(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        let response = client
            .put(uri!(set_profile(*user.id)))
            .header(ContentType::JSON)
            .body(json!({ "node": node.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let profile = Coll::<UserProfile>::from_db(&db)
            .find_one(doc! { "user_id": *user.id }, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.node, Some(node));

        // Unknown nodes are rejected.
        let response = client
            .put(uri!(set_profile(*user.id)))
            .header(ContentType::JSON)
            .body(json!({ "node": Id::new().to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Removing the node.
        let response = client
            .put(uri!(set_profile(*user.id)))
            .header(ContentType::JSON)
            .body(json!({ "node": null }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(uri!(list_profiles)).dispatch().await;
        let profiles: Vec<ProfileDescription> = response.into_json().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].node, None);
    }

    #[backend_test(superuser)]
    async fn reset_links_verify(client: Client, db: Database) {
        let created = create(&client, &UserCredentials::example_staff()).await;
        let response = client
            .get(uri!(password_reset_link(*created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let link: ResetLink = response.into_json().await.unwrap();

        let user = Coll::<User>::from_db(&db)
            .find_one(created.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        let config = client.rocket().state::<Config>().unwrap();
        assert!(check_token(&user, &link.token, Utc::now(), config));
        assert!(link.url.ends_with(&link.token));
    }
}
