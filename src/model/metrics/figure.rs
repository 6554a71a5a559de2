//! Chart figures and tables built from value counts.

use serde::{Deserialize, Serialize};

use super::{aggregate::Counts, group::GraphType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar { x: Vec<String>, y: Vec<usize> },
    Pie { labels: Vec<String>, values: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureLayout {
    pub title: String,
    pub xaxis: Axis,
    pub yaxis: Axis,
}

/// A chart, ready for a plotting front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: FigureLayout,
}

impl Figure {
    pub fn new(graph_type: GraphType, counts: &Counts, title: &str, xaxis: &str, yaxis: &str) -> Self {
        let labels = counts.keys().cloned().collect();
        let values = counts.values().copied().collect();
        let trace = match graph_type {
            GraphType::Bar => Trace::Bar {
                x: labels,
                y: values,
            },
            GraphType::Pie => Trace::Pie { labels, values },
        };
        Self {
            data: vec![trace],
            layout: FigureLayout {
                title: title.to_string(),
                xaxis: Axis {
                    title: xaxis.to_string(),
                },
                yaxis: Axis {
                    title: yaxis.to_string(),
                },
            },
        }
    }
}

/// One row of a value/count table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub name: String,
    pub value: usize,
}

pub fn table(counts: &Counts) -> Vec<TableRow> {
    counts
        .iter()
        .map(|(name, value)| TableRow {
            name: name.clone(),
            value: *value,
        })
        .collect()
}
