mod actor;
pub mod reset;
mod token;

pub use token::{AuthToken, Rights, AUTH_TOKEN_COOKIE};
