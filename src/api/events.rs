use mongodb::{
    bson::{doc, Document},
    Database,
};
use rocket::{
    futures::TryStreamExt,
    serde::json::{Json, Value},
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::event::{EventDescription, EventSpec},
        common::access::{Actor, ScopePolicy},
        db::{
            event::{Event, NewEvent},
            response_set::ResponseSet,
            satellite::Satellite,
        },
        metrics::document_to_row,
        mongodb::{Coll, Id},
    },
};

use super::common::{find_changeable, find_visible, list_visible};

pub fn routes() -> Vec<Route> {
    routes![
        list_events,
        create_event,
        get_event,
        update_event,
        delete_event,
        list_event_records,
        create_event_record,
    ]
}

#[get("/events")]
async fn list_events(actor: Actor, events: Coll<Event>) -> Result<Json<Vec<EventDescription>>> {
    let events = list_visible(
        &events,
        &actor,
        ScopePolicy::Shared,
        doc! {},
        doc! { "date_start": -1, "name": 1 },
    )
    .await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

#[post("/events", data = "<spec>", format = "json")]
async fn create_event(
    actor: Actor,
    spec: Json<EventSpec>,
    new_events: Coll<NewEvent>,
) -> Result<Json<EventDescription>> {
    let event = spec.0.into_event(&actor)?;
    let id: Id = new_events
        .insert_one(&event, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Inserted event has no ID"))?
        .into();
    Ok(Json(Event { id, event }.into()))
}

#[get("/events/<event_id>")]
async fn get_event(
    actor: Actor,
    event_id: Id,
    events: Coll<Event>,
) -> Result<Json<EventDescription>> {
    let event = find_visible(&events, event_id, &actor, "Event").await?;
    Ok(Json(event.into()))
}

#[put("/events/<event_id>", data = "<spec>", format = "json")]
async fn update_event(
    actor: Actor,
    event_id: Id,
    spec: Json<EventSpec>,
    events: Coll<Event>,
    new_events: Coll<NewEvent>,
) -> Result<Json<EventDescription>> {
    find_changeable(&events, event_id, &actor, "Event").await?;
    let event = spec.0.into_event(&actor)?;
    new_events
        .replace_one(event_id.as_doc(), &event, None)
        .await?;
    Ok(Json(Event { id: event_id, event }.into()))
}

/// Delete an event along with its detail records and survey responses.
#[delete("/events/<event_id>")]
async fn delete_event(
    actor: Actor,
    event_id: Id,
    events: Coll<Event>,
    response_sets: Coll<ResponseSet>,
    db: &State<Database>,
) -> Result<()> {
    find_changeable(&events, event_id, &actor, "Event").await?;
    events.delete_one(event_id.as_doc(), None).await?;
    let by_event = doc! { "event_id": event_id };
    for satellite in [Satellite::Impact, Satellite::Quality, Satellite::Demographic] {
        db.collection::<Document>(satellite.collection_name())
            .delete_many(by_event.clone(), None)
            .await?;
    }
    response_sets.delete_many(by_event, None).await?;
    Ok(())
}

#[get("/events/<event_id>/<satellite>")]
async fn list_event_records(
    actor: Actor,
    event_id: Id,
    satellite: Satellite,
    events: Coll<Event>,
    db: &State<Database>,
) -> Result<Json<Vec<Value>>> {
    find_visible(&events, event_id, &actor, "Event").await?;
    let records: Vec<Document> = db
        .collection::<Document>(satellite.collection_name())
        .find(doc! { "event_id": event_id }, None)
        .await?
        .try_collect()
        .await?;
    Ok(Json(records.into_iter().map(document_to_row).collect()))
}

/// Attach a detail record to an event. Anyone who can see the event may add
/// records to it.
#[post("/events/<event_id>/<satellite>", data = "<body>", format = "json")]
async fn create_event_record(
    actor: Actor,
    event_id: Id,
    satellite: Satellite,
    body: Json<Value>,
    events: Coll<Event>,
    db: &State<Database>,
) -> Result<Json<Value>> {
    find_visible(&events, event_id, &actor, "Event").await?;
    let mut record = satellite.parse_record(event_id, body.0)?;
    let inserted = db
        .collection::<Document>(satellite.collection_name())
        .insert_one(&record, None)
        .await?;
    record.insert("_id", inserted.inserted_id);
    Ok(Json(document_to_row(record)))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::model::db::{node::NewNode, profile::UserProfile};

    use super::*;

    async fn create(client: &Client, spec: &EventSpec) -> EventDescription {
        let response = client
            .post(uri!(create_event))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    async fn staff_node(db: &Database) -> Id {
        Coll::<UserProfile>::from_db(db)
            .find_one(None, None)
            .await
            .unwrap()
            .unwrap()
            .node
            .unwrap()
    }

    async fn insert_event(new_events: &Coll<NewEvent>, node: Option<Id>) -> Id {
        let event = NewEvent {
            name: "Foreign event".to_string(),
            event_type: "webinar".to_string(),
            funding: "node".to_string(),
            target_audience: "students".to_string(),
            additional_platforms: vec![],
            communities: vec![],
            date_start: chrono::NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            date_end: chrono::NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            node,
            user: Id::new(),
        };
        new_events
            .insert_one(event, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    #[backend_test(staff)]
    async fn staff_events_land_in_their_node(client: Client, db: Database) {
        let mut spec = EventSpec::example();
        spec.node = Some(Id::new());
        let event = create(&client, &spec).await;
        assert_eq!(event.node.map(|node| *node), Some(staff_node(&db).await));
        assert_eq!(event.event_type, "workshop");

        let response = client.get(uri!(get_event(*event.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test(staff)]
    async fn staff_visibility(client: Client, db: Database, new_nodes: Coll<NewNode>) {
        let new_events = Coll::<NewEvent>::from_db(&db);
        let other_node: Id = new_nodes
            .insert_one(NewNode::example_other(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();
        let foreign = insert_event(&new_events, Some(other_node)).await;
        let shared = insert_event(&new_events, None).await;
        let own = create(&client, &EventSpec::example()).await;

        let response = client.get(uri!(list_events)).dispatch().await;
        let events: Vec<EventDescription> = response.into_json().await.unwrap();
        let ids: Vec<Id> = events.iter().map(|event| *event.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&shared));
        assert!(ids.contains(&*own.id));

        // Other nodes' events are hidden.
        let response = client.get(uri!(get_event(foreign))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.delete(uri!(delete_event(foreign))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        // Shared events are visible but read-only.
        let response = client.get(uri!(get_event(shared))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .put(uri!(update_event(shared)))
            .header(ContentType::JSON)
            .body(json!(EventSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        // Own events can be changed.
        let mut spec = EventSpec::example();
        spec.name = "Renamed".to_string();
        let response = client
            .put(uri!(update_event(*own.id)))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let updated: EventDescription = response.into_json().await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.node, own.node);
    }

    #[backend_test(superuser)]
    async fn superuser_sees_everything(client: Client, new_events: Coll<NewEvent>) {
        insert_event(&new_events, Some(Id::new())).await;
        insert_event(&new_events, None).await;
        let mut spec = EventSpec::example_webinar();
        let node = Id::new();
        spec.node = Some(node);
        let created = create(&client, &spec).await;
        assert_eq!(created.node.map(|node| *node), Some(node));

        let response = client.get(uri!(list_events)).dispatch().await;
        let events: Vec<EventDescription> = response.into_json().await.unwrap();
        assert_eq!(events.len(), 3);
    }

    #[backend_test(superuser)]
    async fn invalid_events_are_rejected(client: Client) {
        let mut spec = EventSpec::example();
        spec.date_end = chrono::NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        let response = client
            .post(uri!(create_event))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(staff)]
    async fn detail_records(client: Client, db: Database) {
        let event = create(&client, &EventSpec::example()).await;

        let response = client
            .post(uri!(create_event_record(*event.id, Satellite::Demographic)))
            .header(ContentType::JSON)
            .body(json!({ "employment_country": "UK", "heard_from": ["email", "colleague"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let row: Value = response.into_json().await.unwrap();
        assert_eq!(row["employment_country"], "UK");
        assert_eq!(row["event_id"], event.id.to_string());

        // Unknown fields are rejected.
        let response = client
            .post(uri!(create_event_record(*event.id, Satellite::Demographic)))
            .header(ContentType::JSON)
            .body(json!({ "favourite_colour": "blue" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .get(uri!(list_event_records(*event.id, Satellite::Demographic)))
            .dispatch()
            .await;
        let rows: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["heard_from"], json!(["email", "colleague"]));

        // Deleting the event removes its records.
        let response = client.delete(uri!(delete_event(*event.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let remaining = db
            .collection::<Document>(Satellite::Demographic.collection_name())
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
