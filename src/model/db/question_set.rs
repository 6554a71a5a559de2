use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core question set data: an ordered collection of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSetCore {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub questions: Vec<Id>,
    pub node: Option<Id>,
    pub user: Id,
}

/// A question set without an ID.
pub type NewQuestionSet = QuestionSetCore;

/// A question set from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub set: QuestionSetCore,
}

impl Deref for QuestionSet {
    type Target = QuestionSetCore;

    fn deref(&self) -> &Self::Target {
        &self.set
    }
}

impl DerefMut for QuestionSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.set
    }
}

node_scoped!(QuestionSetCore, QuestionSet);

/// Core question super-set data: a grouping of question sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSuperSetCore {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub question_sets: Vec<Id>,
    pub node: Option<Id>,
    pub user: Id,
}

/// A question super-set without an ID.
pub type NewQuestionSuperSet = QuestionSuperSetCore;

/// A question super-set from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSuperSet {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub super_set: QuestionSuperSetCore,
}

impl Deref for QuestionSuperSet {
    type Target = QuestionSuperSetCore;

    fn deref(&self) -> &Self::Target {
        &self.super_set
    }
}

impl DerefMut for QuestionSuperSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.super_set
    }
}

node_scoped!(QuestionSuperSetCore, QuestionSuperSet);
