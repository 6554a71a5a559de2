use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A candidate answer to a question, identified by its slug within the question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub slug: String,
    /// The user who last saved this answer.
    pub user: Id,
}

/// Core question data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    pub text: String,
    pub slug: String,
    /// Can more than one answer be selected?
    #[serde(default)]
    pub is_multichoice: bool,
    /// Candidate answers, in display order.
    #[serde(default)]
    pub answers: Vec<Answer>,
    pub node: Option<Id>,
    pub user: Id,
}

impl QuestionCore {
    /// Look up an answer by slug.
    pub fn answer(&self, slug: &str) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.slug == slug)
    }
}

/// A question without an ID.
pub type NewQuestion = QuestionCore;

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}

node_scoped!(QuestionCore, Question);

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use super::*;

    fn answers(user: Id, slugs: &[&str]) -> Vec<Answer> {
        slugs
            .iter()
            .map(|slug| Answer {
                text: slug.to_uppercase(),
                slug: slug.to_string(),
                user,
            })
            .collect()
    }

    impl Question {
        /// Single choice between `a` and `b`.
        pub fn example_single() -> Self {
            let user = Id::new();
            Self {
                id: Id::new(),
                question: QuestionCore {
                    text: "Pick one".to_string(),
                    slug: "q1".to_string(),
                    is_multichoice: false,
                    answers: answers(user, &["a", "b"]),
                    node: None,
                    user,
                },
            }
        }

        /// Multiple choice among `x`, `y` and `z`.
        pub fn example_multi() -> Self {
            let user = Id::new();
            Self {
                id: Id::new(),
                question: QuestionCore {
                    text: "Pick several".to_string(),
                    slug: "q2".to_string(),
                    is_multichoice: true,
                    answers: answers(user, &["x", "y", "z"]),
                    node: None,
                    user,
                },
            }
        }
    }
}
