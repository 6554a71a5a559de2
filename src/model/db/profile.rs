use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Associates a user with their node. Users without a profile have no node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Id,
    pub node: Option<Id>,
}
