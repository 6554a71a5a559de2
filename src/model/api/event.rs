use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::access::Actor,
    db::event::{Event, NewEvent},
    mongodb::Id,
};

/// An event specification, as submitted by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub funding: String,
    pub target_audience: String,
    #[serde(default)]
    pub additional_platforms: Vec<String>,
    #[serde(default)]
    pub communities: Vec<String>,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    /// Ignored for non-superusers, whose own node is always used.
    #[serde(default)]
    pub node: Option<Id>,
}

impl EventSpec {
    /// Convert this spec into an event owned by the actor.
    pub fn into_event(self, actor: &Actor) -> Result<NewEvent> {
        if self.name.trim().is_empty() {
            return Err(Error::bad_request("Event name must not be empty"));
        }
        if self.date_end < self.date_start {
            return Err(Error::bad_request(format!(
                "Event ends ({}) before it starts ({})",
                self.date_end, self.date_start
            )));
        }
        let mut event = NewEvent {
            name: self.name,
            event_type: self.event_type,
            funding: self.funding,
            target_audience: self.target_audience,
            additional_platforms: self.additional_platforms,
            communities: self.communities,
            date_start: self.date_start,
            date_end: self.date_end,
            node: self.node,
            user: actor.id,
        };
        actor.stamp(&mut event);
        Ok(event)
    }
}

/// An API-friendly event description. This is also the row shape the event
/// metrics group aggregates over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
    pub id: ApiId,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub funding: String,
    pub target_audience: String,
    pub additional_platforms: Vec<String>,
    pub communities: Vec<String>,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub node: Option<ApiId>,
    pub user: ApiId,
}

impl From<Event> for EventDescription {
    fn from(event: Event) -> Self {
        let Event { id, event } = event;
        Self {
            id: id.into(),
            name: event.name,
            event_type: event.event_type,
            funding: event.funding,
            target_audience: event.target_audience,
            additional_platforms: event.additional_platforms,
            communities: event.communities,
            date_start: event.date_start,
            date_end: event.date_end,
            node: event.node.map(ApiId::from),
            user: event.user.into(),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use super::*;

    impl EventSpec {
        pub fn example() -> Self {
            Self {
                name: "Intro to workflows".to_string(),
                event_type: "workshop".to_string(),
                funding: "elixir".to_string(),
                target_audience: "researchers".to_string(),
                additional_platforms: vec!["galaxy".to_string()],
                communities: vec!["bioinformatics".to_string()],
                date_start: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
                date_end: NaiveDate::from_ymd_opt(2023, 3, 2).unwrap(),
                node: None,
            }
        }

        pub fn example_webinar() -> Self {
            Self {
                name: "Data stewardship".to_string(),
                event_type: "webinar".to_string(),
                funding: "node".to_string(),
                target_audience: "students".to_string(),
                additional_platforms: vec![],
                communities: vec![],
                date_start: NaiveDate::from_ymd_opt(2023, 6, 10).unwrap(),
                date_end: NaiveDate::from_ymd_opt(2023, 6, 10).unwrap(),
                node: None,
            }
        }
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let actor = Actor {
            id: Id::new(),
            username: "someone".to_string(),
            is_superuser: true,
            node: None,
        };
        let mut spec = EventSpec::example();
        std::mem::swap(&mut spec.date_start, &mut spec.date_end);
        assert!(spec.into_event(&actor).is_err());
    }

    #[test]
    fn staff_events_land_in_their_node() {
        let node = Id::new();
        let actor = Actor {
            id: Id::new(),
            username: "someone".to_string(),
            is_superuser: false,
            node: Some(node),
        };
        let spec = EventSpec {
            node: Some(Id::new()),
            ..EventSpec::example()
        };
        let event = spec.into_event(&actor).unwrap();
        assert_eq!(event.node, Some(node));
        assert_eq!(event.user, actor.id);
    }
}
