use indexmap::IndexMap;
use rocket::serde::json::Value;

use super::aliases::ValueAliases;

/// Value counts for one field, in first-seen order.
pub type Counts = IndexMap<String, usize>;

/// The label a JSON scalar is counted under. Null counts as the empty label.
fn label(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Count how often each value of `field` occurs across `rows`.
///
/// Array values count every element. Rows without the field are skipped.
pub fn calculate_metrics(rows: &[Value], field: &str) -> Counts {
    let mut counts = Counts::new();
    for value in rows.iter().filter_map(|row| row.get(field)) {
        match value {
            Value::Array(items) => {
                for item in items {
                    *counts.entry(label(item)).or_default() += 1;
                }
            }
            scalar => *counts.entry(label(scalar)).or_default() += 1,
        }
    }
    counts
}

/// Replace values with their display names. Values sharing a display name are
/// merged.
pub fn rename_options(counts: Counts, field: &str, aliases: &ValueAliases) -> Counts {
    let mut renamed = Counts::with_capacity(counts.len());
    for (value, count) in counts {
        *renamed
            .entry(aliases.option_name(field, &value).to_string())
            .or_default() += count;
    }
    renamed
}
