use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    db::node::{NewNode, Node},
};

/// A request to create or rename a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
}

impl TryFrom<NodeSpec> for NewNode {
    type Error = Error;

    fn try_from(spec: NodeSpec) -> Result<Self> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(Error::bad_request("Node name must not be empty"));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub id: ApiId,
    pub name: String,
}

impl From<Node> for NodeDescription {
    fn from(node: Node) -> Self {
        Self {
            id: node.id.into(),
            name: node.node.name,
        }
    }
}
