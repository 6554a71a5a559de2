use mongodb::bson::doc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::question_set::{
            QuestionSetDescription, QuestionSetSpec, QuestionSuperSetDescription,
            QuestionSuperSetSpec,
        },
        common::access::{Actor, ScopePolicy},
        db::{
            question::Question,
            question_set::{NewQuestionSet, NewQuestionSuperSet, QuestionSet, QuestionSuperSet},
        },
        form::{FormField, SurveyForm},
        mongodb::{Coll, Id},
    },
};

use super::common::{
    ensure_all_visible, ensure_distinct_slugs, find_changeable, find_visible, list_visible,
    load_questions,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_question_sets,
        create_question_set,
        get_question_set,
        update_question_set,
        delete_question_set,
        question_set_form,
        list_super_sets,
        create_super_set,
        get_super_set,
        update_super_set,
        delete_super_set,
    ]
}

#[get("/question-sets")]
async fn list_question_sets(
    actor: Actor,
    question_sets: Coll<QuestionSet>,
) -> Result<Json<Vec<QuestionSetDescription>>> {
    let sets = list_visible(
        &question_sets,
        &actor,
        ScopePolicy::Shared,
        doc! {},
        doc! { "name": 1 },
    )
    .await?;
    Ok(Json(sets.into_iter().map(Into::into).collect()))
}

#[post("/question-sets", data = "<spec>", format = "json")]
async fn create_question_set(
    actor: Actor,
    spec: Json<QuestionSetSpec>,
    questions: Coll<Question>,
    new_sets: Coll<NewQuestionSet>,
) -> Result<Json<QuestionSetDescription>> {
    let set = spec.0.into_question_set(&actor)?;
    ensure_all_visible(
        &questions,
        &set.questions,
        &actor,
        ScopePolicy::Exclusive,
        "questions",
    )
    .await?;
    ensure_distinct_slugs(&load_questions(&set.questions, &questions).await?)?;
    let id: Id = new_sets
        .insert_one(&set, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Inserted question set has no ID"))?
        .into();
    Ok(Json(QuestionSet { id, set }.into()))
}

#[get("/question-sets/<set_id>")]
async fn get_question_set(
    actor: Actor,
    set_id: Id,
    question_sets: Coll<QuestionSet>,
) -> Result<Json<QuestionSetDescription>> {
    let set = find_visible(&question_sets, set_id, &actor, "Question set").await?;
    Ok(Json(set.into()))
}

#[put("/question-sets/<set_id>", data = "<spec>", format = "json")]
async fn update_question_set(
    actor: Actor,
    set_id: Id,
    spec: Json<QuestionSetSpec>,
    questions: Coll<Question>,
    question_sets: Coll<QuestionSet>,
    new_sets: Coll<NewQuestionSet>,
) -> Result<Json<QuestionSetDescription>> {
    find_changeable(&question_sets, set_id, &actor, "Question set").await?;
    let set = spec.0.into_question_set(&actor)?;
    ensure_all_visible(
        &questions,
        &set.questions,
        &actor,
        ScopePolicy::Exclusive,
        "questions",
    )
    .await?;
    ensure_distinct_slugs(&load_questions(&set.questions, &questions).await?)?;
    new_sets.replace_one(set_id.as_doc(), &set, None).await?;
    Ok(Json(QuestionSet { id: set_id, set }.into()))
}

/// Delete a question set, removing it from every super-set.
#[delete("/question-sets/<set_id>")]
async fn delete_question_set(
    actor: Actor,
    set_id: Id,
    question_sets: Coll<QuestionSet>,
    super_sets: Coll<QuestionSuperSet>,
) -> Result<()> {
    find_changeable(&question_sets, set_id, &actor, "Question set").await?;
    question_sets.delete_one(set_id.as_doc(), None).await?;
    super_sets
        .update_many(
            doc! { "question_sets": set_id },
            doc! { "$pull": { "question_sets": set_id } },
            None,
        )
        .await?;
    Ok(())
}

/// The survey form of a question set: one field per question, in order.
#[get("/question-sets/<set_id>/form")]
async fn question_set_form(
    actor: Actor,
    set_id: Id,
    question_sets: Coll<QuestionSet>,
    questions: Coll<Question>,
) -> Result<Json<Vec<FormField>>> {
    let set = find_visible(&question_sets, set_id, &actor, "Question set").await?;
    let questions = load_questions(&set.questions, &questions).await?;
    Ok(Json(SurveyForm::for_questions(&questions).fields()))
}

#[get("/question-super-sets")]
async fn list_super_sets(
    actor: Actor,
    super_sets: Coll<QuestionSuperSet>,
) -> Result<Json<Vec<QuestionSuperSetDescription>>> {
    let super_sets = list_visible(
        &super_sets,
        &actor,
        ScopePolicy::Shared,
        doc! {},
        doc! { "name": 1 },
    )
    .await?;
    Ok(Json(super_sets.into_iter().map(Into::into).collect()))
}

#[post("/question-super-sets", data = "<spec>", format = "json")]
async fn create_super_set(
    actor: Actor,
    spec: Json<QuestionSuperSetSpec>,
    question_sets: Coll<QuestionSet>,
    new_super_sets: Coll<NewQuestionSuperSet>,
) -> Result<Json<QuestionSuperSetDescription>> {
    let super_set = spec.0.into_super_set(&actor)?;
    ensure_all_visible(
        &question_sets,
        &super_set.question_sets,
        &actor,
        ScopePolicy::Shared,
        "question sets",
    )
    .await?;
    let id: Id = new_super_sets
        .insert_one(&super_set, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Inserted question super-set has no ID"))?
        .into();
    Ok(Json(QuestionSuperSet { id, super_set }.into()))
}

#[get("/question-super-sets/<super_set_id>")]
async fn get_super_set(
    actor: Actor,
    super_set_id: Id,
    super_sets: Coll<QuestionSuperSet>,
) -> Result<Json<QuestionSuperSetDescription>> {
    let super_set = find_visible(&super_sets, super_set_id, &actor, "Question super-set").await?;
    Ok(Json(super_set.into()))
}

#[put("/question-super-sets/<super_set_id>", data = "<spec>", format = "json")]
async fn update_super_set(
    actor: Actor,
    super_set_id: Id,
    spec: Json<QuestionSuperSetSpec>,
    question_sets: Coll<QuestionSet>,
    super_sets: Coll<QuestionSuperSet>,
    new_super_sets: Coll<NewQuestionSuperSet>,
) -> Result<Json<QuestionSuperSetDescription>> {
    find_changeable(&super_sets, super_set_id, &actor, "Question super-set").await?;
    let super_set = spec.0.into_super_set(&actor)?;
    ensure_all_visible(
        &question_sets,
        &super_set.question_sets,
        &actor,
        ScopePolicy::Shared,
        "question sets",
    )
    .await?;
    new_super_sets
        .replace_one(super_set_id.as_doc(), &super_set, None)
        .await?;
    Ok(Json(
        QuestionSuperSet {
            id: super_set_id,
            super_set,
        }
        .into(),
    ))
}

#[delete("/question-super-sets/<super_set_id>")]
async fn delete_super_set(
    actor: Actor,
    super_set_id: Id,
    super_sets: Coll<QuestionSuperSet>,
) -> Result<()> {
    find_changeable(&super_sets, super_set_id, &actor, "Question super-set").await?;
    super_sets.delete_one(super_set_id.as_doc(), None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::model::{
        api::question::{QuestionDescription, QuestionSpec},
        db::question::NewQuestion,
        form::{FieldKind, BLANK_CHOICE},
    };

    use super::*;

    async fn create_question(client: &Client, spec: &QuestionSpec) -> QuestionDescription {
        let response = client
            .post("/questions")
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    async fn create_set(client: &Client, spec: &QuestionSetSpec) -> QuestionSetDescription {
        let response = client
            .post(uri!(create_question_set))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    #[backend_test(staff)]
    async fn set_form_follows_question_order(client: Client) {
        let single = create_question(&client, &QuestionSpec::example_single()).await;
        let multi = create_question(&client, &QuestionSpec::example_multi()).await;
        let set = create_set(&client, &QuestionSetSpec::example(vec![*multi.id, *single.id])).await;
        assert_eq!(set.slug, "post-event-survey");
        assert_eq!(set.questions, vec![multi.id, single.id]);

        let response = client.get(uri!(question_set_form(*set.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let fields: Vec<FormField> = response.into_json().await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "q2");
        assert_eq!(fields[0].kind, FieldKind::MultipleChoice);
        assert_eq!(fields[0].choices.len(), 3);
        assert_eq!(fields[1].name, "q1");
        assert_eq!(fields[1].kind, FieldKind::Choice);
        assert_eq!(fields[1].choices[0].value, BLANK_CHOICE.0);
        assert_eq!(fields[1].choices.len(), 3);
    }

    #[backend_test(staff)]
    async fn unknown_questions_are_rejected(client: Client) {
        let response = client
            .post(uri!(create_question_set))
            .header(ContentType::JSON)
            .body(json!(QuestionSetSpec::example(vec![Id::new()])).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(staff)]
    async fn colliding_slugs_are_rejected(client: Client) {
        let single = create_question(&client, &QuestionSpec::example_single()).await;
        let mut twin = QuestionSpec::example_multi();
        twin.slug = Some(single.slug.clone());
        let twin = create_question(&client, &twin).await;
        assert_eq!(twin.slug, single.slug);

        let response = client
            .post(uri!(create_question_set))
            .header(ContentType::JSON)
            .body(json!(QuestionSetSpec::example(vec![*single.id, *twin.id])).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let set = create_set(&client, &QuestionSetSpec::example(vec![*single.id])).await;
        let response = client
            .put(uri!(update_question_set(*set.id)))
            .header(ContentType::JSON)
            .body(json!(QuestionSetSpec::example(vec![*single.id, *twin.id])).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let response = client.get(uri!(get_question_set(*set.id))).dispatch().await;
        let unchanged: QuestionSetDescription = response.into_json().await.unwrap();
        assert_eq!(unchanged.questions, vec![single.id]);
    }

    #[backend_test(staff)]
    async fn shared_questions_cannot_be_picked(client: Client, new_questions: Coll<NewQuestion>) {
        let shared = NewQuestion {
            text: "Shared".to_string(),
            slug: "shared".to_string(),
            is_multichoice: false,
            answers: vec![],
            node: None,
            user: Id::new(),
        };
        let shared: Id = new_questions
            .insert_one(shared, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        let response = client
            .post(uri!(create_question_set))
            .header(ContentType::JSON)
            .body(json!(QuestionSetSpec::example(vec![shared])).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(staff)]
    async fn deleting_a_question_removes_it_from_sets(client: Client) {
        let single = create_question(&client, &QuestionSpec::example_single()).await;
        let multi = create_question(&client, &QuestionSpec::example_multi()).await;
        let set = create_set(&client, &QuestionSetSpec::example(vec![*single.id, *multi.id])).await;

        let response = client
            .delete(format!("/questions/{}", single.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(uri!(get_question_set(*set.id))).dispatch().await;
        let set: QuestionSetDescription = response.into_json().await.unwrap();
        assert_eq!(set.questions, vec![multi.id]);
    }

    #[backend_test(superuser)]
    async fn superuser_may_assign_owner(client: Client) {
        let single = create_question(&client, &QuestionSpec::example_single()).await;
        let owner = Id::new();
        let mut spec = QuestionSetSpec::example(vec![*single.id]);
        spec.user = Some(owner);
        let set = create_set(&client, &spec).await;
        assert_eq!(*set.user, owner);

        let response = client
            .put(uri!(update_question_set(*set.id)))
            .header(ContentType::JSON)
            .body(json!(QuestionSetSpec::example(vec![])).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let updated: QuestionSetDescription = response.into_json().await.unwrap();
        assert!(updated.questions.is_empty());
        assert_ne!(*updated.user, owner);
    }

    #[backend_test(staff)]
    async fn super_sets(client: Client) {
        let single = create_question(&client, &QuestionSpec::example_single()).await;
        let set = create_set(&client, &QuestionSetSpec::example(vec![*single.id])).await;

        let spec = json!({ "name": "All surveys", "question_sets": [set.id] });
        let response = client
            .post(uri!(create_super_set))
            .header(ContentType::JSON)
            .body(spec.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let super_set: QuestionSuperSetDescription = response.into_json().await.unwrap();
        assert_eq!(super_set.slug, "all-surveys");
        assert_eq!(super_set.question_sets, vec![set.id]);

        // Deleting the set empties the super-set.
        let response = client.delete(uri!(delete_question_set(*set.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(uri!(get_super_set(*super_set.id))).dispatch().await;
        let super_set: QuestionSuperSetDescription = response.into_json().await.unwrap();
        assert!(super_set.question_sets.is_empty());

        let response = client.get(uri!(list_super_sets)).dispatch().await;
        let super_sets: Vec<QuestionSuperSetDescription> = response.into_json().await.unwrap();
        assert_eq!(super_sets.len(), 1);
    }
}
