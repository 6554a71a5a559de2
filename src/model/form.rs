//! Survey forms, built at runtime from the questions of a question set.
//!
//! Each question becomes one field keyed by its slug. Submissions are
//! all-or-nothing: either every question gets a response or none does.

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use rocket::{form::Form, http::RawStr};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{
        question::{Answer, Question},
        response_set::Response,
    },
};

/// The placeholder choice offered first by single-choice fields.
pub const BLANK_CHOICE: (&str, &str) = ("", "---------");

/// Reported against every unanswered question of a partial submission.
pub const PARTIAL_SUBMISSION_ERROR: &str = "All responses need to be commited simultaneously";

fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {value} is not one of the available choices.")
}

/// A raw submitted value: free text, or a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInput {
    Text(String),
    List(Vec<String>),
}

/// Raw submitted values, keyed by field name.
pub type RawSubmission = IndexMap<String, RawInput>;

/// Parse an `application/x-www-form-urlencoded` body. Repeated keys become
/// lists; a key given once is text.
pub fn parse_urlencoded(body: &str) -> RawSubmission {
    let mut fields: IndexMap<String, Vec<String>> = IndexMap::new();
    // Fields arrive still percent-encoded.
    for field in Form::values(body) {
        let name = RawStr::new(field.name.source().as_str())
            .url_decode_lossy()
            .into_owned();
        let value = RawStr::new(field.value).url_decode_lossy().into_owned();
        fields.entry(name).or_default().push(value);
    }
    fields
        .into_iter()
        .map(|(name, mut values)| {
            let input = if values.len() == 1 {
                RawInput::Text(values.remove(0))
            } else {
                RawInput::List(values)
            };
            (name, input)
        })
        .collect()
}

/// Split comma-separated text into trimmed, non-empty items.
fn parse_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Choice,
    MultipleChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormChoice {
    pub value: String,
    pub label: String,
}

impl FormChoice {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// One field of a survey form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub choices: Vec<FormChoice>,
    pub question_id: ApiId,
}

impl From<&Question> for FormField {
    fn from(question: &Question) -> Self {
        let answers = question
            .answers
            .iter()
            .map(|answer| FormChoice::new(&answer.slug, &answer.text));
        let (kind, choices) = if question.is_multichoice {
            (FieldKind::MultipleChoice, answers.collect())
        } else {
            let blank = FormChoice::new(BLANK_CHOICE.0, BLANK_CHOICE.1);
            (
                FieldKind::Choice,
                std::iter::once(blank).chain(answers).collect(),
            )
        };
        Self {
            name: question.slug.clone(),
            label: question.text.clone(),
            kind,
            choices,
            question_id: question.id.into(),
        }
    }
}

/// Validation errors, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(IndexMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The errors reported against one field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Display for FormErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<_> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// A validated response to one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedResponse<'q> {
    pub question: &'q Question,
    /// The chosen answers, in the question's display order.
    pub answers: Vec<&'q Answer>,
}

impl CleanedResponse<'_> {
    pub fn to_response(&self) -> Response {
        Response {
            question_id: self.question.id,
            answers: self
                .answers
                .iter()
                .map(|answer| answer.slug.clone())
                .collect(),
        }
    }
}

/// A form over an ordered list of questions.
#[derive(Debug, Clone, Copy)]
pub struct SurveyForm<'q> {
    questions: &'q [Question],
}

impl<'q> SurveyForm<'q> {
    pub fn for_questions(questions: &'q [Question]) -> Self {
        Self { questions }
    }

    /// The form's fields, in question order.
    pub fn fields(&self) -> Vec<FormField> {
        self.questions.iter().map(FormField::from).collect()
    }

    /// Validate a submission, resolving each value to the question's answers.
    ///
    /// Unknown keys are ignored. An empty submission is valid and yields no
    /// responses; a partial one is rejected.
    pub fn clean(&self, mut raw: RawSubmission) -> Result<Vec<CleanedResponse<'q>>, FormErrors> {
        let mut errors = FormErrors::default();
        let mut cleaned = Vec::new();

        for question in self.questions {
            let Some(input) = raw.swap_remove(&question.slug) else {
                continue;
            };
            let values = match (question.is_multichoice, input) {
                (true, RawInput::Text(text)) => parse_list(&text),
                (true, RawInput::List(items)) => items
                    .iter()
                    .flat_map(|item| parse_list(item))
                    .collect(),
                (false, RawInput::Text(text)) => vec![text],
                (false, RawInput::List(items)) => items,
            };
            let values: Vec<String> = values.into_iter().filter(|v| !v.is_empty()).collect();

            if values.is_empty() {
                continue;
            }
            if !question.is_multichoice && values.len() > 1 {
                errors.add(&question.slug, invalid_choice(&values.join(", ")));
                continue;
            }
            if let Some(invalid) = values.iter().find(|v| question.answer(v).is_none()) {
                errors.add(&question.slug, invalid_choice(invalid));
                continue;
            }

            let answers = question
                .answers
                .iter()
                .filter(|answer| values.contains(&answer.slug))
                .collect();
            cleaned.push(CleanedResponse { question, answers });
        }

        if !cleaned.is_empty() && cleaned.len() != self.questions.len() {
            for question in self.questions {
                if !cleaned.iter().any(|response| response.question.id == question.id) {
                    errors.add(&question.slug, PARTIAL_SUBMISSION_ERROR);
                }
            }
        }

        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(errors)
        }
    }
}
