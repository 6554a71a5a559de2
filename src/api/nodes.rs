use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::node::{NodeDescription, NodeSpec},
        common::access::Actor,
        db::{
            node::{NewNode, Node},
            profile::UserProfile,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_nodes, create_node, update_node, delete_node]
}

#[get("/nodes")]
async fn list_nodes(_actor: Actor, nodes: Coll<Node>) -> Result<Json<Vec<NodeDescription>>> {
    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let nodes: Vec<Node> = nodes.find(None, options).await?.try_collect().await?;
    Ok(Json(nodes.into_iter().map(Into::into).collect()))
}

#[post("/nodes", data = "<spec>", format = "json")]
async fn create_node(
    actor: Actor,
    spec: Json<NodeSpec>,
    new_nodes: Coll<NewNode>,
) -> Result<Json<NodeDescription>> {
    actor.ensure_superuser()?;
    let node = NewNode::try_from(spec.0)?;
    let id: Id = new_nodes
        .insert_one(&node, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Inserted node has no ID"))?
        .into();
    Ok(Json(Node { id, node }.into()))
}

#[put("/nodes/<node_id>", data = "<spec>", format = "json")]
async fn update_node(
    actor: Actor,
    node_id: Id,
    spec: Json<NodeSpec>,
    new_nodes: Coll<NewNode>,
) -> Result<Json<NodeDescription>> {
    actor.ensure_superuser()?;
    let node = NewNode::try_from(spec.0)?;
    let result = new_nodes.replace_one(node_id.as_doc(), &node, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Node {node_id}")));
    }
    Ok(Json(Node { id: node_id, node }.into()))
}

/// Delete a node. Its members are left without a node; its records stay but
/// are only visible to superusers.
#[delete("/nodes/<node_id>")]
async fn delete_node(
    actor: Actor,
    node_id: Id,
    nodes: Coll<Node>,
    profiles: Coll<UserProfile>,
) -> Result<()> {
    actor.ensure_superuser()?;
    let result = nodes.delete_one(node_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Node {node_id}")));
    }
    profiles
        .update_many(
            doc! { "node": node_id },
            doc! { "$set": { "node": null } },
            None,
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;

    async fn create(client: &Client, name: &str) -> NodeDescription {
        let response = client
            .post(uri!(create_node))
            .header(ContentType::JSON)
            .body(json!({ "name": name }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    #[backend_test(superuser)]
    async fn node_lifecycle(client: Client) {
        let beta = create(&client, "beta").await;
        create(&client, "alpha").await;

        let response = client.get(uri!(list_nodes)).dispatch().await;
        let nodes: Vec<NodeDescription> = response.into_json().await.unwrap();
        let names: Vec<_> = nodes.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta"]);

        let response = client
            .put(uri!(update_node(*beta.id)))
            .header(ContentType::JSON)
            .body(json!({ "name": "gamma" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let renamed: NodeDescription = response.into_json().await.unwrap();
        assert_eq!(renamed.id, beta.id);
        assert_eq!(renamed.name, "gamma");

        let response = client.delete(uri!(delete_node(*beta.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client.delete(uri!(delete_node(*beta.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(superuser)]
    async fn empty_names_are_rejected(client: Client) {
        let response = client
            .post(uri!(create_node))
            .header(ContentType::JSON)
            .body(json!({ "name": "  " }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(staff)]
    async fn staff_can_only_read(client: Client) {
        let response = client.get(uri!(list_nodes)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let nodes: Vec<NodeDescription> = response.into_json().await.unwrap();
        assert_eq!(nodes.len(), 1);

        let response = client
            .post(uri!(create_node))
            .header(ContentType::JSON)
            .body(json!({ "name": "mine" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }
}
