use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use chrono::{NaiveDate, TimeZone, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use rocket::{
    form::{self, prelude::ErrorKind, FromFormField, ValueField},
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};

/// A database ID.
///
/// Deserializes from either a hex string or MongoDB's `{"$oid": ...}` form,
/// so request bodies can carry plain strings.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(ObjectId);

impl Id {
    /// Generate a fresh unique ID.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// A filter document selecting this ID.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self.0 }
    }
}

impl Deref for Id {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for Id {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<ObjectId>()?))
    }
}

impl From<ObjectId> for Id {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<Id> for Bson {
    fn from(id: Id) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl<'a> FromParam<'a> for Id {
    type Error = mongodb::bson::oid::Error;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse::<Id>()
    }
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for Id {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        field.value.parse::<ObjectId>().map(Id).map_err(|err| {
            let error = ErrorKind::Custom(Box::new(err));
            error.into()
        })
    }
}

impl UriDisplay<Path> for Id {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(self.to_string())
    }
}

impl_from_uri_param_identity!([Path] Id);

/// Calendar dates are stored as BSON datetimes at midnight UTC, so that range
/// queries compare correctly.
pub mod bson_date {
    use super::*;

    use mongodb::bson::DateTime as BsonDateTime;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        to_bson_datetime(*date).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let datetime = BsonDateTime::deserialize(deserializer)?;
        Ok(datetime.to_chrono().date_naive())
    }

    /// Convert a date to the BSON datetime it is stored as.
    pub fn to_bson_datetime(date: NaiveDate) -> BsonDateTime {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight always exists");
        BsonDateTime::from_chrono(Utc.from_utc_datetime(&midnight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_parses_hex_and_displays_it_back() {
        let hex = "64b7f0c2a1e4c3b2a1d0e9f8";
        let id: Id = hex.parse().unwrap();
        assert_eq!(id.to_string(), hex);
        assert_eq!(id.as_doc(), doc! { "_id": ObjectId::parse_str(hex).unwrap() });
    }

    #[test]
    fn dates_are_stored_at_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let stored = bson_date::to_bson_datetime(date).to_chrono();
        assert_eq!(stored.to_rfc3339(), "2024-03-09T00:00:00+00:00");
    }
}
