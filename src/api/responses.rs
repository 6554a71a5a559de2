use log::info;
use mongodb::bson::doc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::response::ResponseSetDescription,
        common::access::{Actor, ScopePolicy},
        db::{
            event::Event,
            question::Question,
            question_set::QuestionSet,
            response_set::{NewResponseSet, ResponseSet},
        },
        form::{parse_urlencoded, RawSubmission, SurveyForm},
        mongodb::{Coll, Id},
    },
};

use super::common::{find_changeable, find_visible, list_visible, load_questions};

pub fn routes() -> Vec<Route> {
    routes![
        submit_json,
        submit_form,
        list_response_sets,
        get_response_set,
        delete_response_set,
    ]
}

/// Collections touched by a survey submission.
struct SubmissionColls {
    events: Coll<Event>,
    question_sets: Coll<QuestionSet>,
    questions: Coll<Question>,
    new_response_sets: Coll<NewResponseSet>,
}

/// Validate and store one survey submission. Nothing is stored for an empty
/// submission.
async fn submit(
    actor: &Actor,
    event_id: Id,
    question_set_id: Id,
    raw: RawSubmission,
    colls: SubmissionColls,
) -> Result<Option<ResponseSetDescription>> {
    let event = find_visible(&colls.events, event_id, actor, "Event").await?;
    let set = find_visible(&colls.question_sets, question_set_id, actor, "Question set").await?;
    let questions = load_questions(&set.questions, &colls.questions).await?;

    let cleaned = SurveyForm::for_questions(&questions)
        .clean(raw)
        .map_err(Error::Validation)?;
    if cleaned.is_empty() {
        return Ok(None);
    }

    let mut response_set = NewResponseSet {
        event_id,
        question_set_id,
        responses: cleaned.iter().map(|response| response.to_response()).collect(),
        node: event.node,
        user: actor.id,
    };
    actor.stamp(&mut response_set);
    let id: Id = colls
        .new_response_sets
        .insert_one(&response_set, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Inserted response set has no ID"))?
        .into();
    info!(
        "Stored {} responses for event {event_id} from '{}'",
        response_set.responses.len(),
        actor.username
    );
    Ok(Some(
        ResponseSet {
            id,
            response_set,
        }
        .into(),
    ))
}

#[post(
    "/events/<event_id>/responses/<question_set_id>",
    data = "<raw>",
    format = "json"
)]
#[allow(clippy::too_many_arguments)]
async fn submit_json(
    actor: Actor,
    event_id: Id,
    question_set_id: Id,
    raw: Json<RawSubmission>,
    events: Coll<Event>,
    question_sets: Coll<QuestionSet>,
    questions: Coll<Question>,
    new_response_sets: Coll<NewResponseSet>,
) -> Result<Json<Option<ResponseSetDescription>>> {
    let colls = SubmissionColls {
        events,
        question_sets,
        questions,
        new_response_sets,
    };
    let stored = submit(&actor, event_id, question_set_id, raw.0, colls).await?;
    Ok(Json(stored))
}

#[post(
    "/events/<event_id>/responses/<question_set_id>",
    data = "<body>",
    format = "form"
)]
#[allow(clippy::too_many_arguments)]
async fn submit_form(
    actor: Actor,
    event_id: Id,
    question_set_id: Id,
    body: String,
    events: Coll<Event>,
    question_sets: Coll<QuestionSet>,
    questions: Coll<Question>,
    new_response_sets: Coll<NewResponseSet>,
) -> Result<Json<Option<ResponseSetDescription>>> {
    let colls = SubmissionColls {
        events,
        question_sets,
        questions,
        new_response_sets,
    };
    let raw = parse_urlencoded(&body);
    let stored = submit(&actor, event_id, question_set_id, raw, colls).await?;
    Ok(Json(stored))
}

#[get("/responses?<event>")]
async fn list_response_sets(
    actor: Actor,
    event: Option<Id>,
    response_sets: Coll<ResponseSet>,
) -> Result<Json<Vec<ResponseSetDescription>>> {
    let filter = match event {
        Some(event_id) => doc! { "event_id": event_id },
        None => doc! {},
    };
    let response_sets = list_visible(
        &response_sets,
        &actor,
        ScopePolicy::Shared,
        filter,
        doc! { "_id": 1 },
    )
    .await?;
    Ok(Json(response_sets.into_iter().map(Into::into).collect()))
}

#[get("/responses/<response_set_id>")]
async fn get_response_set(
    actor: Actor,
    response_set_id: Id,
    response_sets: Coll<ResponseSet>,
) -> Result<Json<ResponseSetDescription>> {
    let response_set =
        find_visible(&response_sets, response_set_id, &actor, "Response set").await?;
    Ok(Json(response_set.into()))
}

#[delete("/responses/<response_set_id>")]
async fn delete_response_set(
    actor: Actor,
    response_set_id: Id,
    response_sets: Coll<ResponseSet>,
) -> Result<()> {
    find_changeable(&response_sets, response_set_id, &actor, "Response set").await?;
    response_sets
        .delete_one(response_set_id.as_doc(), None)
        .await?;
    Ok(())
}
