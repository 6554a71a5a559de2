pub mod api;
pub mod common;
pub mod db;
pub mod form;
pub mod metrics;
pub mod mongodb;
