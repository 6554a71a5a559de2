use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::{access::Actor, slug::slug_or_derive},
    db::question::{Answer, NewQuestion, Question},
    mongodb::Id,
};

/// A candidate answer specification. The slug is derived from the text when
/// omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSpec {
    pub text: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// A question specification, with its answers in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub text: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_multichoice: bool,
    #[serde(default)]
    pub answers: Vec<AnswerSpec>,
    /// Ignored for non-superusers, whose own node is always used.
    #[serde(default)]
    pub node: Option<Id>,
}

impl QuestionSpec {
    /// Convert this spec into a question owned by the actor.
    ///
    /// When replacing an existing question, answers that are unchanged keep
    /// their original owner; new or edited answers are stamped with the actor.
    pub fn into_question(self, actor: &Actor, previous: Option<&Question>) -> Result<NewQuestion> {
        let slug = slug_or_derive(self.slug, &self.text);
        if slug.is_empty() {
            return Err(Error::bad_request(format!(
                "Cannot derive a slug for question '{}'",
                self.text
            )));
        }

        let mut seen = HashSet::new();
        let mut answers = Vec::with_capacity(self.answers.len());
        for spec in self.answers {
            let slug = slug_or_derive(spec.slug, &spec.text);
            if slug.is_empty() {
                return Err(Error::bad_request(format!(
                    "Cannot derive a slug for answer '{}'",
                    spec.text
                )));
            }
            if !seen.insert(slug.clone()) {
                return Err(Error::bad_request(format!("Duplicate answer slug '{slug}'")));
            }
            let user = previous
                .and_then(|question| question.answer(&slug))
                .filter(|answer| answer.text == spec.text)
                .map_or(actor.id, |answer| answer.user);
            answers.push(Answer {
                text: spec.text,
                slug,
                user,
            });
        }

        let mut question = NewQuestion {
            text: self.text,
            slug,
            is_multichoice: self.is_multichoice,
            answers,
            node: self.node,
            user: actor.id,
        };
        actor.stamp(&mut question);
        Ok(question)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDescription {
    pub text: String,
    pub slug: String,
    pub user: ApiId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDescription {
    pub id: ApiId,
    pub text: String,
    pub slug: String,
    pub is_multichoice: bool,
    pub answers: Vec<AnswerDescription>,
    pub node: Option<ApiId>,
    pub user: ApiId,
}

impl QuestionDescription {
    /// Describe a question as the actor may see it: non-superusers only see
    /// the answers they saved themselves.
    pub fn for_actor(question: Question, actor: &Actor) -> Self {
        let Question { id, question } = question;
        let answers = question
            .answers
            .into_iter()
            .filter(|answer| actor.is_superuser || answer.user == actor.id)
            .map(|answer| AnswerDescription {
                text: answer.text,
                slug: answer.slug,
                user: answer.user.into(),
            })
            .collect();
        Self {
            id: id.into(),
            text: question.text,
            slug: question.slug,
            is_multichoice: question.is_multichoice,
            answers,
            node: question.node.map(ApiId::from),
            user: question.user.into(),
        }
    }
}

/// An entry in the question picker used when building question sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionChoice {
    pub id: ApiId,
    pub text: String,
    pub slug: String,
}

impl From<Question> for QuestionChoice {
    fn from(question: Question) -> Self {
        Self {
            id: question.id.into(),
            text: question.question.text,
            slug: question.question.slug,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use super::*;

    impl QuestionSpec {
        /// Single choice between `a` and `b`.
        pub fn example_single() -> Self {
            Self {
                text: "Pick one".to_string(),
                slug: Some("q1".to_string()),
                is_multichoice: false,
                answers: vec![AnswerSpec::new("A", "a"), AnswerSpec::new("B", "b")],
                node: None,
            }
        }

        /// Multiple choice among `x`, `y` and `z`.
        pub fn example_multi() -> Self {
            Self {
                text: "Pick several".to_string(),
                slug: Some("q2".to_string()),
                is_multichoice: true,
                answers: vec![
                    AnswerSpec::new("X", "x"),
                    AnswerSpec::new("Y", "y"),
                    AnswerSpec::new("Z", "z"),
                ],
                node: None,
            }
        }
    }

    impl AnswerSpec {
        pub fn new(text: &str, slug: &str) -> Self {
            Self {
                text: text.to_string(),
                slug: Some(slug.to_string()),
            }
        }
    }

    fn actor(is_superuser: bool) -> Actor {
        Actor {
            id: Id::new(),
            username: "someone".to_string(),
            is_superuser,
            node: Some(Id::new()),
        }
    }

    #[test]
    fn slugs_are_derived() {
        let spec = QuestionSpec {
            text: "How did you hear about us?".to_string(),
            slug: None,
            is_multichoice: true,
            answers: vec![AnswerSpec {
                text: "Word of mouth".to_string(),
                slug: None,
            }],
            node: None,
        };
        let question = spec.into_question(&actor(true), None).unwrap();
        assert_eq!(question.slug, "how-did-you-hear-about-us");
        assert_eq!(question.answers[0].slug, "word-of-mouth");
    }

    #[test]
    fn duplicate_answer_slugs_are_rejected() {
        let mut spec = QuestionSpec::example_single();
        spec.answers.push(AnswerSpec::new("Another A", "a"));
        assert!(spec.into_question(&actor(true), None).is_err());
    }

    #[test]
    fn unchanged_answers_keep_their_owner() {
        let author = actor(false);
        let editor = Actor {
            node: author.node,
            ..actor(false)
        };
        let original = QuestionSpec::example_single()
            .into_question(&author, None)
            .unwrap();
        let original = Question {
            id: Id::new(),
            question: original,
        };

        let mut spec = QuestionSpec::example_single();
        spec.answers[1].text = "Bee".to_string();
        let updated = spec.into_question(&editor, Some(&original)).unwrap();
        assert_eq!(updated.answers[0].user, author.id);
        assert_eq!(updated.answers[1].user, editor.id);
        assert_eq!(updated.user, editor.id);
    }

    #[test]
    fn staff_only_see_their_own_answers() {
        let author = actor(false);
        let mut question = Question::example_single();
        question.answers[0].user = author.id;

        let description = QuestionDescription::for_actor(question.clone(), &author);
        assert_eq!(description.answers.len(), 1);
        assert_eq!(description.answers[0].slug, "a");

        let description = QuestionDescription::for_actor(question, &actor(true));
        assert_eq!(description.answers.len(), 2);
    }
}
