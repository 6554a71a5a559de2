//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Dates are serialised as `YYYY-MM-DD`.
//!
//! `*Spec` types arrive in request bodies; `*Description` types leave in
//! responses.

pub mod auth;
pub mod event;
pub mod id;
pub mod node;
pub mod question;
pub mod question_set;
pub mod response;
pub mod user;
