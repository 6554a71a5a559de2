//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

/// Implement the node-scoping traits for a record core and its ID-carrying
/// wrapper. Both must have `node: Option<Id>` and `user: Id` fields.
macro_rules! node_scoped {
    ($core:ty, $record:ty) => {
        impl $crate::model::common::access::NodeScoped for $core {
            fn node(&self) -> Option<$crate::model::mongodb::Id> {
                self.node
            }
        }

        impl $crate::model::common::access::Stamped for $core {
            fn set_user(&mut self, user: $crate::model::mongodb::Id) {
                self.user = user;
            }

            fn set_node(&mut self, node: Option<$crate::model::mongodb::Id>) {
                self.node = node;
            }
        }

        impl $crate::model::common::access::NodeScoped for $record {
            fn node(&self) -> Option<$crate::model::mongodb::Id> {
                self.node
            }
        }
    };
}

pub mod event;
pub mod node;
pub mod profile;
pub mod question;
pub mod question_set;
pub mod response_set;
pub mod satellite;
pub mod user;
