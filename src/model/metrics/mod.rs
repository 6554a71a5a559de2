//! Metrics aggregation over events and their satellite records.

mod aggregate;
mod aliases;
pub mod dashboard;
mod figure;
mod group;

use indexmap::IndexMap;

pub use aggregate::{calculate_metrics, rename_options, Counts};
pub use aliases::ValueAliases;
pub use figure::{table, Figure, TableRow, Trace};
pub use group::{document_to_row, FilterParams, GraphType, Group, GroupKind};

use crate::model::db::satellite::Satellite;

const GROUP_NAME: &str = "Number of answers";

/// The registry of aggregation groups, built once at startup and shared
/// through managed state.
#[derive(Debug)]
pub struct Metrics {
    groups: IndexMap<&'static str, Group>,
    aliases: ValueAliases,
}

impl Metrics {
    pub fn new(aliases: ValueAliases) -> Self {
        let groups = [
            Group::event(
                "event",
                GROUP_NAME,
                &["type", "funding", "target_audience", "additional_platforms"],
            )
            .with_field_mapping(&[
                ("Event type", "type"),
                ("Funding", "funding"),
                ("Target audience", "target_audience"),
                ("Additional platforms", "additional_platforms"),
            ]),
            Group::related(
                "impact",
                GROUP_NAME,
                Satellite::Impact,
                &[
                    "when_attend_training",
                    "main_attend_reason",
                    "how_often_use_before",
                    "how_often_use_after",
                    "able_to_explain",
                    "able_use_now",
                    "attending_led_to",
                    "people_share_knowledge",
                    "recommend_others",
                ],
            )
            .with_graph_type(GraphType::Pie),
            Group::related(
                "quality",
                GROUP_NAME,
                Satellite::Quality,
                &[
                    "used_resources_before",
                    "used_resources_future",
                    "recommend_course",
                    "course_rating",
                    "balance",
                    "email_contact",
                ],
            )
            .with_graph_type(GraphType::Pie),
            Group::related(
                "demographic",
                GROUP_NAME,
                Satellite::Demographic,
                &[
                    "employment_country",
                    "heard_from",
                    "employment_sector",
                    "gender",
                    "career_stage",
                ],
            )
            .with_graph_type(GraphType::Pie),
        ]
        .into_iter()
        .map(|group| (group.key(), group))
        .collect();

        Self { groups, aliases }
    }

    pub fn group(&self, key: &str) -> Option<&Group> {
        self.groups.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn aliases(&self) -> &ValueAliases {
        &self.aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_the_four_groups() {
        let metrics = Metrics::new(ValueAliases::default());
        let keys: Vec<_> = metrics.groups().map(Group::key).collect();
        assert_eq!(keys, ["event", "impact", "quality", "demographic"]);

        let event = metrics.group("event").unwrap();
        assert_eq!(event.graph_type(), GraphType::Bar);
        assert_eq!(event.kind(), GroupKind::Event);
        assert_eq!(event.name(), "Number of answers");

        let demographic = metrics.group("demographic").unwrap();
        assert_eq!(demographic.graph_type(), GraphType::Pie);
        assert_eq!(demographic.kind(), GroupKind::Related(Satellite::Demographic));
        assert_eq!(demographic.field_title("gender"), "gender");

        assert!(metrics.group("nope").is_none());
    }
}
