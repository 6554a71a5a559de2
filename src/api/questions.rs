use mongodb::bson::doc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::question::{QuestionChoice, QuestionDescription, QuestionSpec},
        common::access::{Actor, ScopePolicy},
        db::{
            question::{Answer, NewQuestion, Question},
            question_set::QuestionSet,
        },
        mongodb::{Coll, Id},
    },
};

use super::common::{find_changeable, find_visible, list_visible};

pub fn routes() -> Vec<Route> {
    routes![
        list_questions,
        question_choices,
        create_question,
        get_question,
        update_question,
        delete_question,
    ]
}

#[get("/questions")]
async fn list_questions(
    actor: Actor,
    questions: Coll<Question>,
) -> Result<Json<Vec<QuestionDescription>>> {
    let questions = list_visible(
        &questions,
        &actor,
        ScopePolicy::Shared,
        doc! {},
        doc! { "slug": 1 },
    )
    .await?;
    Ok(Json(
        questions
            .into_iter()
            .map(|question| QuestionDescription::for_actor(question, &actor))
            .collect(),
    ))
}

/// The questions offered when building a question set: only the actor's own
/// node's questions, without shared ones.
#[get("/questions/choices")]
async fn question_choices(
    actor: Actor,
    questions: Coll<Question>,
) -> Result<Json<Vec<QuestionChoice>>> {
    let questions = list_visible(
        &questions,
        &actor,
        ScopePolicy::Exclusive,
        doc! {},
        doc! { "slug": 1 },
    )
    .await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

#[post("/questions", data = "<spec>", format = "json")]
async fn create_question(
    actor: Actor,
    spec: Json<QuestionSpec>,
    new_questions: Coll<NewQuestion>,
) -> Result<Json<QuestionDescription>> {
    let question = spec.0.into_question(&actor, None)?;
    let id: Id = new_questions
        .insert_one(&question, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Inserted question has no ID"))?
        .into();
    Ok(Json(QuestionDescription::for_actor(
        Question { id, question },
        &actor,
    )))
}

#[get("/questions/<question_id>")]
async fn get_question(
    actor: Actor,
    question_id: Id,
    questions: Coll<Question>,
) -> Result<Json<QuestionDescription>> {
    let question = find_visible(&questions, question_id, &actor, "Question").await?;
    Ok(Json(QuestionDescription::for_actor(question, &actor)))
}

/// Replace a question. Answers the actor cannot see are kept as they were.
#[put("/questions/<question_id>", data = "<spec>", format = "json")]
async fn update_question(
    actor: Actor,
    question_id: Id,
    spec: Json<QuestionSpec>,
    questions: Coll<Question>,
    new_questions: Coll<NewQuestion>,
) -> Result<Json<QuestionDescription>> {
    let previous = find_changeable(&questions, question_id, &actor, "Question").await?;
    let mut question = spec.0.into_question(&actor, Some(&previous))?;
    if !actor.is_superuser {
        let hidden: Vec<Answer> = previous
            .question
            .answers
            .into_iter()
            .filter(|answer| answer.user != actor.id && question.answer(&answer.slug).is_none())
            .collect();
        question.answers.extend(hidden);
    }
    new_questions
        .replace_one(question_id.as_doc(), &question, None)
        .await?;
    Ok(Json(QuestionDescription::for_actor(
        Question {
            id: question_id,
            question,
        },
        &actor,
    )))
}

/// Delete a question, removing it from every question set.
#[delete("/questions/<question_id>")]
async fn delete_question(
    actor: Actor,
    question_id: Id,
    questions: Coll<Question>,
    question_sets: Coll<QuestionSet>,
) -> Result<()> {
    find_changeable(&questions, question_id, &actor, "Question").await?;
    questions.delete_one(question_id.as_doc(), None).await?;
    question_sets
        .update_many(
            doc! { "questions": question_id },
            doc! { "$pull": { "questions": question_id } },
            None,
        )
        .await?;
    Ok(())
}
