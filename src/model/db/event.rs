use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{bson_date, Id};

/// Core event data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCore {
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub funding: String,
    pub target_audience: String,
    #[serde(default)]
    pub additional_platforms: Vec<String>,
    #[serde(default)]
    pub communities: Vec<String>,
    #[serde(with = "bson_date")]
    pub date_start: NaiveDate,
    #[serde(with = "bson_date")]
    pub date_end: NaiveDate,
    pub node: Option<Id>,
    /// The user who last saved this event.
    pub user: Id,
}

/// An event without an ID.
pub type NewEvent = EventCore;

/// An event from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub event: EventCore,
}

impl Deref for Event {
    type Target = EventCore;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

impl DerefMut for Event {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.event
    }
}

node_scoped!(EventCore, Event);
