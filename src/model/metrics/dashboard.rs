//! Dashboard pages and their wiring.
//!
//! Each page shows one metrics group. Its layout lists the filter controls
//! (one dropdown per filter field, a date range and a node-only toggle) and
//! either a chart plus table per field or a single combined table. Its wiring
//! maps the filter inputs, in order, to the outputs recomputed on every
//! change.

use std::collections::HashMap;
use std::sync::Arc;

use csv::Writer;
use indexmap::IndexMap;
use log::{debug, info};
use mongodb::Database;
use rocket::{
    request::FromParam,
    serde::json::{serde_json, Value},
    tokio::sync::{Mutex, OnceCell},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{
    aggregate::{calculate_metrics, rename_options, Counts},
    aliases::ValueAliases,
    figure::{table, Figure, TableRow},
    group::{FilterParams, Group},
};

pub const DATE_RANGE_ID: &str = "date-picker-range";
pub const NODE_ONLY_ID: &str = "node-only-toggle";
pub const DATA_TABLE_ID: &str = "data-table";

const PAGE_SIZE: usize = 10;

/// The dashboard pages, in navigation order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    WorldMap,
    EventReport,
    QualityReport,
    DemographicReport,
    ImpactReport,
    AllEvents,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::WorldMap,
        Page::EventReport,
        Page::QualityReport,
        Page::DemographicReport,
        Page::ImpactReport,
        Page::AllEvents,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::WorldMap => "world-map",
            Self::EventReport => "event-report",
            Self::QualityReport => "quality-report",
            Self::DemographicReport => "demographic-report",
            Self::ImpactReport => "impact-report",
            Self::AllEvents => "all-events",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::WorldMap => "World map",
            Self::EventReport => "Event metrics",
            Self::QualityReport => "Quality metrics",
            Self::DemographicReport => "Demographics metrics",
            Self::ImpactReport => "Impact metrics",
            Self::AllEvents => "All events",
        }
    }

    pub fn url(self) -> String {
        format!("/dashboard/{}", self.slug())
    }

    /// The key of the metrics group this page shows.
    pub fn group_key(self) -> &'static str {
        match self {
            Self::EventReport | Self::AllEvents => "event",
            Self::QualityReport => "quality",
            Self::WorldMap | Self::DemographicReport => "demographic",
            Self::ImpactReport => "impact",
        }
    }

    pub fn view(self) -> View {
        match self {
            Self::AllEvents => View::Table,
            _ => View::Panels,
        }
    }

    /// The fields this page displays from its group.
    pub fn fields(self, group: &Group) -> Vec<String> {
        match self {
            Self::WorldMap => vec!["employment_country".to_string()],
            _ => group.fields().to_vec(),
        }
    }
}

impl<'a> FromParam<'a> for Page {
    type Error = &'a str;

    fn from_param(param: &'a str) -> std::result::Result<Self, Self::Error> {
        Page::ALL
            .into_iter()
            .find(|page| page.slug() == param)
            .ok_or(param)
    }
}

/// How a page presents its fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// A chart and a value/count table per field.
    Panels,
    /// One table with a row per record.
    Table,
}

/// A navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub title: String,
    pub url: String,
    pub active: bool,
}

/// The navigation tabs, marking the active page.
pub fn tabs(active: Option<Page>) -> Vec<Tab> {
    Page::ALL
        .into_iter()
        .map(|page| Tab {
            title: page.title().to_string(),
            url: page.url(),
            active: Some(page) == active,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Column {
    fn new(name: &str, id: &str, kind: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            kind: kind.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTable {
    pub id: String,
    pub columns: Vec<Column>,
    pub page_size: usize,
    pub export_format: String,
}

impl DataTable {
    fn new(id: String, columns: Vec<Column>) -> Self {
        Self {
            id,
            columns,
            page_size: PAGE_SIZE,
            export_format: "csv".to_string(),
        }
    }
}

/// A chart with its companion value/count table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub field: String,
    pub table: DataTable,
    pub graph_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Panels { panels: Vec<Panel> },
    Table { table: DataTable },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropdown {
    pub id: String,
    pub placeholder: String,
    pub options: Vec<DropdownOption>,
    pub multi: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub page: Page,
    pub title: String,
    pub node_only_id: String,
    pub date_range_id: String,
    pub date_format: String,
    pub dropdowns: Vec<Dropdown>,
    pub content: Content,
}

/// Build the layout of a page.
pub async fn build_layout(
    page: Page,
    group: &Group,
    db: &Database,
    aliases: &ValueAliases,
) -> Result<Layout> {
    debug!("Building dashboard layout for {}", page.slug());
    let mut dropdowns = Vec::with_capacity(group.filter_fields().len());
    for field in group.filter_fields() {
        let alias_field = field.strip_prefix("event_").unwrap_or(field);
        let options = group
            .field_options(db, field)
            .await?
            .iter()
            .map(|value| DropdownOption {
                label: aliases.option_name(alias_field, value).to_string(),
                value: value.clone(),
            })
            .collect();
        dropdowns.push(Dropdown {
            id: field.clone(),
            placeholder: group.field_placeholder(field),
            options,
            multi: false,
        });
    }

    let fields = page.fields(group);
    let content = match page.view() {
        View::Panels => Content::Panels {
            panels: fields
                .iter()
                .map(|field| Panel {
                    field: field.clone(),
                    table: DataTable::new(
                        format!("{field}-table"),
                        vec![
                            Column::new(group.field_title(field), "name", Some("text")),
                            Column::new(group.name(), "value", Some("numeric")),
                        ],
                    ),
                    graph_id: format!("{field}-graph"),
                })
                .collect(),
        },
        View::Table => Content::Table {
            table: DataTable::new(
                DATA_TABLE_ID.to_string(),
                fields
                    .iter()
                    .map(|field| Column::new(group.field_title(field), field, None))
                    .collect(),
            ),
        },
    };

    Ok(Layout {
        page,
        title: page.title().to_string(),
        node_only_id: NODE_ONLY_ID.to_string(),
        date_range_id: DATE_RANGE_ID.to_string(),
        date_format: "YYYY-MM-DD".to_string(),
        dropdowns,
        content,
    })
}

/// A recomputed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub id: String,
    pub property: String,
}

/// A filter input, and the parameter it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub id: String,
    pub property: String,
    pub param: String,
}

impl Input {
    fn new(id: &str, property: &str, param: &str) -> Self {
        Self {
            id: id.to_string(),
            property: property.to_string(),
            param: param.to_string(),
        }
    }
}

/// A flattened record, with list values joined.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Figure(Figure),
    Table(Vec<TableRow>),
    Records(Vec<Record>),
}

/// Output values keyed by output ID, in wiring order.
pub type Update = IndexMap<String, OutputValue>;

/// The inputs and outputs of one page showing one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wiring {
    pub page: Page,
    pub group: String,
    pub view: View,
    pub fields: Vec<String>,
    pub outputs: Vec<Output>,
    pub inputs: Vec<Input>,
}

impl Wiring {
    pub fn new(page: Page, group: &Group) -> Self {
        let fields = page.fields(group);
        let view = page.view();
        let outputs = match view {
            View::Panels => fields
                .iter()
                .flat_map(|field| {
                    [
                        Output {
                            id: format!("{field}-graph"),
                            property: "figure".to_string(),
                        },
                        Output {
                            id: format!("{field}-table"),
                            property: "data".to_string(),
                        },
                    ]
                })
                .collect(),
            View::Table => vec![Output {
                id: DATA_TABLE_ID.to_string(),
                property: "data".to_string(),
            }],
        };
        let inputs = group
            .filter_fields()
            .iter()
            .map(|field| Input::new(field, "value", field))
            .chain([
                Input::new(DATE_RANGE_ID, "start_date", "date_from"),
                Input::new(DATE_RANGE_ID, "end_date", "date_to"),
                Input::new(NODE_ONLY_ID, "value", "node_only"),
            ])
            .collect();

        Self {
            page,
            group: group.key().to_string(),
            view,
            fields,
            outputs,
            inputs,
        }
    }

    /// Pair input values, in wiring order, with their parameter names.
    /// Missing trailing values count as empty.
    pub fn params(&self, values: Vec<Option<String>>) -> Result<FilterParams> {
        let values = values.into_iter().chain(std::iter::repeat(None));
        FilterParams::from_inputs(
            self.inputs
                .iter()
                .map(|input| input.param.as_str())
                .zip(values),
        )
    }

    /// Recompute every output from the store.
    pub async fn invoke(
        &self,
        group: &Group,
        db: &Database,
        aliases: &ValueAliases,
        values: Vec<Option<String>>,
    ) -> Result<Update> {
        let rows = group.values(db, &self.params(values)?).await?;
        Ok(self.render(group, aliases, rows))
    }

    /// Turn fetched rows into output values.
    pub fn render(&self, group: &Group, aliases: &ValueAliases, rows: Vec<Value>) -> Update {
        let mut update = Update::new();
        match self.view {
            View::Panels => {
                let yaxis = format!("No. of {}", group.name());
                for field in &self.fields {
                    let counts = field_counts(field, &rows, aliases);
                    let title = group.field_title(field);
                    let figure = Figure::new(group.graph_type(), &counts, title, title, &yaxis);
                    update.insert(format!("{field}-graph"), OutputValue::Figure(figure));
                    update.insert(format!("{field}-table"), OutputValue::Table(table(&counts)));
                }
            }
            View::Table => {
                update.insert(
                    DATA_TABLE_ID.to_string(),
                    OutputValue::Records(flatten_records(rows)),
                );
            }
        }
        update
    }

    /// Export a table as CSV: the value/count table of `field` on panel
    /// pages, or the combined table on table pages.
    pub async fn csv(
        &self,
        group: &Group,
        db: &Database,
        aliases: &ValueAliases,
        values: Vec<Option<String>>,
        field: Option<&str>,
    ) -> Result<String> {
        let rows = group.values(db, &self.params(values)?).await?;
        match self.view {
            View::Panels => {
                let field = field
                    .filter(|field| self.fields.iter().any(|f| f == field))
                    .ok_or_else(|| {
                        Error::bad_request(format!(
                            "Choose one of the fields: {}",
                            self.fields.join(", ")
                        ))
                    })?;
                counts_csv(&table(&field_counts(field, &rows, aliases)))
            }
            View::Table => records_csv(&self.fields, &flatten_records(rows)),
        }
    }
}

fn field_counts(field: &str, rows: &[Value], aliases: &ValueAliases) -> Counts {
    rename_options(calculate_metrics(rows, field), field, aliases)
}

/// Flatten rows for the combined table: list values are joined with `", "`.
pub fn flatten_records(rows: Vec<Value>) -> Vec<Record> {
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .map(|map| {
            map.into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::Array(items) => Value::String(
                            items
                                .iter()
                                .map(cell_text)
                                .collect::<Vec<_>>()
                                .join(", "),
                        ),
                        other => other,
                    };
                    (key, value)
                })
                .collect()
        })
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// A value/count table as CSV, with header `name,value` taken from the
/// first serialized row.
pub fn counts_csv(rows: &[TableRow]) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);
    if rows.is_empty() {
        writer.write_record(["name", "value"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    finish(writer)
}

/// Records as CSV, one column per field.
pub fn records_csv(columns: &[String], records: &[Record]) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(
            columns
                .iter()
                .map(|column| record.get(column).map(cell_text).unwrap_or_default()),
        )?;
    }
    finish(writer)
}

/// Per-process dashboard state: each page's layout, built once, and the
/// wiring registered for each (page, group) pair.
pub struct DashboardRegistry {
    layouts: [OnceCell<Layout>; Page::ALL.len()],
    wirings: Mutex<HashMap<(Page, String), Arc<Wiring>>>,
}

impl DashboardRegistry {
    pub fn new() -> Self {
        Self {
            layouts: std::array::from_fn(|_| OnceCell::new()),
            wirings: Mutex::new(HashMap::new()),
        }
    }

    /// The layout of a page, built on first request.
    pub async fn layout(
        &self,
        page: Page,
        group: &Group,
        db: &Database,
        aliases: &ValueAliases,
    ) -> Result<&Layout> {
        self.layouts[page as usize]
            .get_or_try_init(|| build_layout(page, group, db, aliases))
            .await
    }

    /// Register a group on a page. Registering the same pair again returns
    /// the existing wiring.
    pub async fn register(&self, page: Page, group: &Group) -> Arc<Wiring> {
        let mut wirings = self.wirings.lock().await;
        wirings
            .entry((page, group.key().to_string()))
            .or_insert_with(|| {
                info!("Registering dashboard wiring for {} / {}", page.slug(), group.key());
                Arc::new(Wiring::new(page, group))
            })
            .clone()
    }

    /// The number of distinct registrations.
    pub async fn registered(&self) -> usize {
        self.wirings.lock().await.len()
    }
}

impl Default for DashboardRegistry {
    fn default() -> Self {
        Self::new()
    }
}
