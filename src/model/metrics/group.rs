use chrono::NaiveDate;
use indexmap::IndexMap;
use log::debug;
use mongodb::{
    bson::{doc, Bson, Document},
    Database,
};
use rocket::{
    futures::TryStreamExt,
    serde::json::{serde_json, Value},
    tokio::sync::OnceCell,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::event::EventDescription,
    db::{event::Event, satellite::Satellite},
    mongodb::{bson_date::to_bson_datetime, Coll, MongoCollection},
};

/// Filters offered by groups over events.
pub const EVENT_FILTER_FIELDS: [&str; 4] =
    ["type", "funding", "target_audience", "additional_platforms"];

/// Filters offered by groups over satellite records, applied to the related
/// event.
pub const RELATED_FILTER_FIELDS: [&str; 4] = [
    "event_type",
    "event_funding",
    "event_target_audience",
    "event_additional_platforms",
];

/// Event fields whose options related groups expose as `event_<field>`.
const RELATED_OPTION_FIELDS: [&str; 5] = [
    "type",
    "funding",
    "target_audience",
    "additional_platforms",
    "communities",
];

const RELATED_PREFIX: &str = "event_";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    Bar,
    Pie,
}

/// What a group queries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Event,
    /// Satellite records, filtered through their event.
    Related(Satellite),
}

/// Distinct observed values per field.
pub type FieldOptions = IndexMap<String, Vec<String>>;

/// Parameters narrowing the rows a group returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    values: IndexMap<String, String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Accepted but not applied.
    pub node_only: bool,
}

impl FilterParams {
    /// Build parameters from named inputs. Unknown names are treated as
    /// field filters; blank inputs are dropped.
    pub fn from_inputs<'a, I>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Option<String>)>,
    {
        let mut params = Self::default();
        for (name, input) in inputs {
            let Some(input) = input.filter(|input| !input.trim().is_empty()) else {
                continue;
            };
            match name {
                "date_from" => params.date_from = Some(parse_date(&input)?),
                "date_to" => params.date_to = Some(parse_date(&input)?),
                "node_only" => params.node_only = is_truthy(&input),
                field => {
                    params.values.insert(field.to_string(), input);
                }
            }
        }
        Ok(params)
    }

    /// Set an exact-match filter.
    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.values.insert(field.to_string(), value.to_string());
        self
    }

    /// The filter value for a field, if one was given.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Parse a `YYYY-MM-DD` date, ignoring any time part.
fn parse_date(input: &str) -> Result<NaiveDate> {
    let date = input.split('T').next().unwrap_or(input).trim();
    date.parse()
        .map_err(|_| Error::bad_request(format!("Invalid date: {input}")))
}

fn is_truthy(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

/// A dashboard aggregation group: a set of displayable fields over one kind
/// of record, with filters and lazily-loaded field options.
#[derive(Debug)]
pub struct Group {
    key: &'static str,
    name: String,
    /// Title → field ID.
    field_mapping: IndexMap<String, String>,
    use_fields: Vec<String>,
    filter_fields: Vec<String>,
    graph_type: GraphType,
    kind: GroupKind,
    options: OnceCell<FieldOptions>,
}

impl Group {
    fn new(key: &'static str, name: &str, kind: GroupKind, use_fields: &[&str]) -> Self {
        let filter_fields = match kind {
            GroupKind::Event => EVENT_FILTER_FIELDS.as_slice(),
            GroupKind::Related(_) => RELATED_FILTER_FIELDS.as_slice(),
        };
        Self {
            key,
            name: name.to_string(),
            field_mapping: IndexMap::new(),
            use_fields: use_fields.iter().map(|f| f.to_string()).collect(),
            filter_fields: filter_fields.iter().map(|f| f.to_string()).collect(),
            graph_type: GraphType::Bar,
            kind,
            options: OnceCell::new(),
        }
    }

    /// A group over events.
    pub fn event(key: &'static str, name: &str, use_fields: &[&str]) -> Self {
        Self::new(key, name, GroupKind::Event, use_fields)
    }

    /// A group over one kind of satellite record.
    pub fn related(key: &'static str, name: &str, satellite: Satellite, use_fields: &[&str]) -> Self {
        Self::new(key, name, GroupKind::Related(satellite), use_fields)
    }

    pub fn with_graph_type(mut self, graph_type: GraphType) -> Self {
        self.graph_type = graph_type;
        self
    }

    /// Give fields human-readable titles, as `(title, field)` pairs.
    pub fn with_field_mapping(mut self, mapping: &[(&str, &str)]) -> Self {
        self.field_mapping = mapping
            .iter()
            .map(|(title, field)| (title.to_string(), field.to_string()))
            .collect();
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.use_fields
    }

    pub fn filter_fields(&self) -> &[String] {
        &self.filter_fields
    }

    pub fn graph_type(&self) -> GraphType {
        self.graph_type
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// The title of a field, or the field ID if it has none.
    pub fn field_title<'a>(&'a self, field: &'a str) -> &'a str {
        self.field_mapping
            .iter()
            .find(|(_, id)| *id == field)
            .map_or(field, |(title, _)| title.as_str())
    }

    pub fn field_placeholder(&self, field: &str) -> String {
        format!("Select {}", self.field_title(field))
    }

    /// Distinct observed values of a field. All options are read from the
    /// store on first use and cached for the life of the process.
    pub async fn field_options(&self, db: &Database, field: &str) -> Result<&[String]> {
        let options = self
            .options
            .get_or_try_init(|| self.load_options(db))
            .await?;
        Ok(options.get(field).map_or(&[][..], Vec::as_slice))
    }

    async fn load_options(&self, db: &Database) -> Result<FieldOptions> {
        debug!("Loading field options for metrics group '{}'", self.key);
        let mut options = FieldOptions::new();
        let records = db.collection::<Document>(self.collection_name());
        for field in &self.use_fields {
            let values = records.distinct(field, None, None).await?;
            options.insert(field.clone(), option_labels(values));
        }
        if let GroupKind::Related(_) = self.kind {
            let events = Coll::<Event>::from_db(db);
            for field in RELATED_OPTION_FIELDS {
                let values = events.distinct(field, None, None).await?;
                options.insert(format!("{RELATED_PREFIX}{field}"), option_labels(values));
            }
        }
        Ok(options)
    }

    fn collection_name(&self) -> &'static str {
        match self.kind {
            GroupKind::Event => Event::NAME,
            GroupKind::Related(satellite) => satellite.collection_name(),
        }
    }

    /// The event query selected by the parameters.
    ///
    /// Exact-match filters apply only when non-empty. The date range applies
    /// only when both bounds are given, and then both the start and end date
    /// must fall inside it.
    pub fn event_filter(&self, params: &FilterParams) -> Document {
        let prefix = match self.kind {
            GroupKind::Event => "",
            GroupKind::Related(_) => RELATED_PREFIX,
        };
        let mut filter = Document::new();
        for field in &self.filter_fields {
            if let Some(value) = params.value(field) {
                let event_field = field.strip_prefix(prefix).unwrap_or(field);
                filter.insert(event_field, value);
            }
        }
        if let (Some(from), Some(to)) = (params.date_from, params.date_to) {
            let range = doc! {
                "$gte": to_bson_datetime(from),
                "$lte": to_bson_datetime(to),
            };
            filter.insert("date_start", range.clone());
            filter.insert("date_end", range);
        }
        if params.node_only {
            debug!("Ignoring node-only filter for metrics group '{}'", self.key);
        }
        filter
    }

    /// The filtered rows of this group, as JSON objects.
    pub async fn values(&self, db: &Database, params: &FilterParams) -> Result<Vec<Value>> {
        let event_filter = self.event_filter(params);
        let events = Coll::<Event>::from_db(db);
        match self.kind {
            GroupKind::Event => {
                let events: Vec<Event> = events.find(event_filter, None).await?.try_collect().await?;
                events
                    .into_iter()
                    .map(|event| Ok(serde_json::to_value(EventDescription::from(event))?))
                    .collect()
            }
            GroupKind::Related(satellite) => {
                let filter = if event_filter.is_empty() {
                    doc! {}
                } else {
                    let event_ids = events.distinct("_id", event_filter, None).await?;
                    doc! { "event_id": { "$in": event_ids } }
                };
                let records: Vec<Document> = db
                    .collection::<Document>(satellite.collection_name())
                    .find(filter, None)
                    .await?
                    .try_collect()
                    .await?;
                Ok(records.into_iter().map(document_to_row).collect())
            }
        }
    }
}

fn option_labels(values: Vec<Bson>) -> Vec<String> {
    let mut labels: Vec<String> = values
        .into_iter()
        .filter_map(|value| match value {
            Bson::Null => None,
            Bson::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Convert a stored record into a plain JSON row. IDs become hex strings and
/// datetimes become dates.
pub fn document_to_row(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(key, value)| {
                let key = if key == "_id" { "id".to_string() } else { key };
                (key, bson_to_json(value))
            })
            .collect(),
    )
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(datetime) => Value::String(datetime.to_chrono().date_naive().to_string()),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(document) => document_to_row(document),
        other => other.into_relaxed_extjson(),
    }
}
