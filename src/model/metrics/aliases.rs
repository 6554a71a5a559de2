use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::Reader;
use log::debug;
use serde::Deserialize;

/// A row of the alias file: `field,value,alias`.
#[derive(Debug, Deserialize)]
struct AliasRecord {
    field: String,
    value: String,
    alias: String,
}

/// Display names for stored option values, per field.
#[derive(Debug, Clone, Default)]
pub struct ValueAliases(HashMap<String, HashMap<String, String>>);

impl ValueAliases {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        Self::from_csv(Reader::from_reader(reader))
    }

    pub fn from_path(path: &Path) -> Result<Self, csv::Error> {
        debug!("Loading value aliases from {}", path.display());
        Self::from_csv(Reader::from_path(path)?)
    }

    fn from_csv<R: Read>(mut reader: Reader<R>) -> Result<Self, csv::Error> {
        let mut aliases = Self::default();
        for record in reader.deserialize() {
            let AliasRecord {
                field,
                value,
                alias,
            } = record?;
            aliases.0.entry(field).or_default().insert(value, alias);
        }
        Ok(aliases)
    }

    /// The display name of a field's value, or the value itself.
    pub fn option_name<'a>(&'a self, field: &str, value: &'a str) -> &'a str {
        self.0
            .get(field)
            .and_then(|values| values.get(value))
            .map_or(value, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_keep_their_name() {
        let aliases =
            ValueAliases::from_reader("field,value,alias\ntype,workshop,Workshop\n".as_bytes())
                .unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.option_name("type", "workshop"), "Workshop");
        assert_eq!(aliases.option_name("type", "webinar"), "webinar");
        assert_eq!(aliases.option_name("funding", "workshop"), "workshop");
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(ValueAliases::from_reader("field,value\ntype\n".as_bytes()).is_err());
    }

    #[test]
    fn bundled_alias_file_loads() {
        let aliases = ValueAliases::from_path(Path::new("value-aliases.csv")).unwrap();
        assert!(!aliases.is_empty());
    }
}
