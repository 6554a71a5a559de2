use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An organisational node. Users and records belong to at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCore {
    pub name: String,
}

/// A node without an ID.
pub type NewNode = NodeCore;

/// A node from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub node: NodeCore,
}

impl Deref for Node {
    type Target = NodeCore;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}
