//! Node-scoped access control.
//!
//! Every record belongs to at most one node. Superusers see and change
//! everything; other users see records of their own node plus shared records
//! (those with no node), and may only change records of their own node.

use mongodb::bson::{doc, Bson, Document};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// A record that may belong to a node.
pub trait NodeScoped {
    /// The owning node, or `None` if the record is shared.
    fn node(&self) -> Option<Id>;
}

/// A record whose owner and node are stamped on save.
pub trait Stamped: NodeScoped {
    fn set_user(&mut self, user: Id);
    fn set_node(&mut self, node: Option<Id>);
}

/// Whether shared (node-less) records are visible alongside the actor's own.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScopePolicy {
    /// Own node plus shared records.
    Shared,
    /// Own node only.
    Exclusive,
}

/// The set of records an actor may see.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Visibility {
    All,
    Node { node: Id, include_shared: bool },
    Nothing,
}

impl Visibility {
    /// The MongoDB filter selecting visible records, or `None` if nothing is
    /// visible and the query can be skipped entirely.
    pub fn filter(&self) -> Option<Document> {
        match *self {
            Self::All => Some(doc! {}),
            Self::Node {
                node,
                include_shared: true,
            } => Some(doc! { "$or": [{ "node": node }, { "node": Bson::Null }] }),
            Self::Node {
                node,
                include_shared: false,
            } => Some(doc! { "node": node }),
            Self::Nothing => None,
        }
    }

    /// Combine the visibility filter with another filter.
    pub fn restrict(&self, filter: Document) -> Option<Document> {
        let scope = self.filter()?;
        if scope.is_empty() {
            Some(filter)
        } else if filter.is_empty() {
            Some(scope)
        } else {
            Some(doc! { "$and": [scope, filter] })
        }
    }

    /// Does this visibility admit a record with the given node?
    pub fn admits(&self, record_node: Option<Id>) -> bool {
        match *self {
            Self::All => true,
            Self::Node {
                node,
                include_shared,
            } => match record_node {
                Some(record_node) => record_node == node,
                None => include_shared,
            },
            Self::Nothing => false,
        }
    }
}

/// The authenticated user performing a request, with their node resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Id,
    pub username: String,
    pub is_superuser: bool,
    pub node: Option<Id>,
}

impl Actor {
    /// The records this actor may see under the given policy.
    pub fn visibility(&self, policy: ScopePolicy) -> Visibility {
        if self.is_superuser {
            return Visibility::All;
        }
        match self.node {
            Some(node) => Visibility::Node {
                node,
                include_shared: policy == ScopePolicy::Shared,
            },
            None => Visibility::Nothing,
        }
    }

    /// Can this actor see the given record?
    pub fn can_view<R: NodeScoped>(&self, record: &R) -> bool {
        self.visibility(ScopePolicy::Shared).admits(record.node())
    }

    /// Can this actor change the given record? `None` stands for a record
    /// that does not exist yet, which anyone may create.
    pub fn can_change<R: NodeScoped>(&self, record: Option<&R>) -> bool {
        match record {
            None => true,
            Some(_) if self.is_superuser => true,
            Some(record) => self.node.is_some() && self.node == record.node(),
        }
    }

    /// Fail with `403 Forbidden` unless [`Self::can_change`] allows it.
    pub fn ensure_can_change<R: NodeScoped>(&self, record: &R) -> Result<()> {
        if self.can_change(Some(record)) {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "User '{}' cannot change records of another node",
                self.username
            )))
        }
    }

    /// Fail with `403 Forbidden` unless this actor is a superuser.
    pub fn ensure_superuser(&self) -> Result<()> {
        if self.is_superuser {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "User '{}' is not a superuser",
                self.username
            )))
        }
    }

    /// Stamp ownership onto a record about to be saved. Non-superusers always
    /// save into their own node, whatever the submitted node was.
    pub fn stamp<R: Stamped>(&self, record: &mut R) {
        self.stamp_with_owner(record, None);
    }

    /// As [`Self::stamp`], but a superuser may name a different owner.
    pub fn stamp_with_owner<R: Stamped>(&self, record: &mut R, owner: Option<Id>) {
        let owner = owner.filter(|_| self.is_superuser).unwrap_or(self.id);
        record.set_user(owner);
        if !self.is_superuser {
            record.set_node(self.node);
        }
    }
}
