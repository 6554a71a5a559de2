use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The answers chosen for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: Id,
    /// Slugs of the chosen answers. Single-choice questions have exactly one.
    pub answers: Vec<String>,
}

/// One respondent's submission for a question set against an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSetCore {
    pub event_id: Id,
    pub question_set_id: Id,
    pub responses: Vec<Response>,
    pub node: Option<Id>,
    pub user: Id,
}

/// A response set without an ID.
pub type NewResponseSet = ResponseSetCore;

/// A response set from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSet {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub response_set: ResponseSetCore,
}

impl Deref for ResponseSet {
    type Target = ResponseSetCore;

    fn deref(&self) -> &Self::Target {
        &self.response_set
    }
}

node_scoped!(ResponseSetCore, ResponseSet);
