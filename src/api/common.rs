use std::collections::HashSet;
use std::fmt::Display;

use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::model::{
    common::access::{Actor, NodeScoped, ScopePolicy},
    db::question::Question,
    mongodb::{Coll, Id},
};

/// Fetch a record the actor may see, or fail with `404 Not Found`.
///
/// Records of other nodes are reported as missing rather than forbidden.
pub async fn find_visible<T>(coll: &Coll<T>, id: Id, actor: &Actor, what: impl Display) -> Result<T>
where
    T: NodeScoped + DeserializeOwned + Unpin + Send + Sync,
{
    coll.find_one(id.as_doc(), None)
        .await?
        .filter(|record| actor.can_view(record))
        .ok_or_else(|| Error::not_found(format!("{what} {id}")))
}

/// Fetch a record the actor may change, or fail with `404 Not Found` if they
/// cannot see it or `403 Forbidden` if they can see but not change it.
pub async fn find_changeable<T>(
    coll: &Coll<T>,
    id: Id,
    actor: &Actor,
    what: impl Display,
) -> Result<T>
where
    T: NodeScoped + DeserializeOwned + Unpin + Send + Sync,
{
    let record = find_visible(coll, id, actor, what).await?;
    actor.ensure_can_change(&record)?;
    Ok(record)
}

/// All records the actor may see under the given policy, sorted.
pub async fn list_visible<T>(
    coll: &Coll<T>,
    actor: &Actor,
    policy: ScopePolicy,
    filter: Document,
    sort: Document,
) -> Result<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let Some(filter) = actor.visibility(policy).restrict(filter) else {
        return Ok(Vec::new());
    };
    let options = FindOptions::builder().sort(sort).build();
    Ok(coll.find(filter, options).await?.try_collect().await?)
}

/// Load questions by ID, in the order given. Fails if any is missing.
pub async fn load_questions(ids: &[Id], questions: &Coll<Question>) -> Result<Vec<Question>> {
    let found: Vec<Question> = questions
        .find(doc! { "_id": { "$in": ids } }, None)
        .await?
        .try_collect()
        .await?;
    ids.iter()
        .map(|id| {
            found
                .iter()
                .find(|question| question.id == *id)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("Question {id}")))
        })
        .collect()
}

/// Fail with `400 Bad Request` if two questions share a slug. Form fields are
/// keyed by slug, so such a set could never be answered.
pub fn ensure_distinct_slugs(questions: &[Question]) -> Result<()> {
    let mut slugs = HashSet::with_capacity(questions.len());
    match questions
        .iter()
        .find(|question| !slugs.insert(question.slug.as_str()))
    {
        Some(question) => Err(Error::bad_request(format!(
            "More than one question has the slug '{}'",
            question.slug
        ))),
        None => Ok(()),
    }
}

/// Fail with `400 Bad Request` unless every ID names a record visible to the
/// actor under the given policy. IDs listed twice are rejected.
pub async fn ensure_all_visible<T>(
    coll: &Coll<T>,
    ids: &[Id],
    actor: &Actor,
    policy: ScopePolicy,
    what: &str,
) -> Result<()>
where
    T: Send + Sync,
{
    if ids.is_empty() {
        return Ok(());
    }
    let mut distinct = HashSet::with_capacity(ids.len());
    if let Some(id) = ids.iter().find(|id| !distinct.insert(**id)) {
        return Err(Error::bad_request(format!("{id} listed more than once in {what}")));
    }
    let Some(filter) = actor
        .visibility(policy)
        .restrict(doc! { "_id": { "$in": ids } })
    else {
        return Err(Error::bad_request(format!("Unknown {what}")));
    };
    let count = coll.count_documents(filter, None).await?;
    if count as usize == ids.len() {
        Ok(())
    } else {
        Err(Error::bad_request(format!("Unknown {what} in {ids:?}")))
    }
}
