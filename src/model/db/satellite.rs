//! Per-event survey detail records: impact, quality and demographic answers.

use mongodb::bson::{to_document, Document};
use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
    serde::json::serde_json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{Id, MongoCollection};

/// The kinds of detail record attached to events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Satellite {
    Impact,
    Quality,
    Demographic,
}

impl Satellite {
    /// The collection holding records of this kind.
    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::Impact => EventDetail::<Impact>::NAME,
            Self::Quality => EventDetail::<Quality>::NAME,
            Self::Demographic => EventDetail::<Demographic>::NAME,
        }
    }

    /// Validate a submitted record of this kind and convert it into a
    /// document ready for insertion.
    pub fn parse_record(&self, event_id: Id, body: serde_json::Value) -> Result<Document> {
        match self {
            Self::Impact => to_record::<Impact>(event_id, body),
            Self::Quality => to_record::<Quality>(event_id, body),
            Self::Demographic => to_record::<Demographic>(event_id, body),
        }
    }
}

fn to_record<T>(event_id: Id, body: serde_json::Value) -> Result<Document>
where
    T: DeserializeOwned + Serialize,
{
    let answers: T = serde_json::from_value(body)
        .map_err(|err| Error::bad_request(format!("Malformed record: {err}")))?;
    let record = EventDetail { event_id, answers };
    Ok(to_document(&record)?)
}

impl<'a> FromParam<'a> for Satellite {
    type Error = &'a str;

    fn from_param(param: &'a str) -> std::result::Result<Self, Self::Error> {
        match param {
            "impact" => Ok(Self::Impact),
            "quality" => Ok(Self::Quality),
            "demographic" => Ok(Self::Demographic),
            other => Err(other),
        }
    }
}

impl UriDisplay<Path> for Satellite {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_raw(match self {
            Self::Impact => "impact",
            Self::Quality => "quality",
            Self::Demographic => "demographic",
        })
    }
}

impl_from_uri_param_identity!([Path] Satellite);

/// A detail record tied to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail<T> {
    pub event_id: Id,
    #[serde(flatten)]
    pub answers: T,
}

impl MongoCollection for EventDetail<Impact> {
    const NAME: &'static str = "impacts";
}
impl MongoCollection for EventDetail<Quality> {
    const NAME: &'static str = "qualities";
}
impl MongoCollection for EventDetail<Demographic> {
    const NAME: &'static str = "demographics";
}

/// What attending an event changed for the respondent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Impact {
    pub when_attend_training: String,
    pub main_attend_reason: String,
    pub how_often_use_before: String,
    pub how_often_use_after: String,
    pub able_to_explain: String,
    pub able_use_now: String,
    pub attending_led_to: Vec<String>,
    pub people_share_knowledge: String,
    pub recommend_others: String,
}

/// The respondent's view of the event's quality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Quality {
    pub used_resources_before: String,
    pub used_resources_future: String,
    pub recommend_course: String,
    pub course_rating: String,
    pub balance: String,
    pub email_contact: String,
}

/// Who the respondent is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Demographic {
    pub employment_country: String,
    pub heard_from: Vec<String>,
    pub employment_sector: String,
    pub gender: String,
    pub career_stage: String,
}
