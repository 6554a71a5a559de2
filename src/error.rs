use std::fmt::Display;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::{
    bson::{oid::Error as OidError, ser::Error as BsonSerError},
    error::Error as DbError,
};
use rocket::{
    http::Status,
    response::Responder,
    serde::json::{serde_json::Error as JsonError, Json},
    Request,
};
use thiserror::Error;

use crate::model::{form::FormErrors, mongodb::is_duplicate_key_error};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    BsonSer(#[from] BsonSerError),
    #[error(transparent)]
    OidParse(#[from] OidError),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{1}")]
    Status(Status, String),
    #[error("Invalid submission: {0}")]
    Validation(FormErrors),
}

impl Error {
    pub fn bad_request(reason: impl Display) -> Self {
        Self::Status(Status::BadRequest, reason.to_string())
    }

    pub fn forbidden(reason: impl Display) -> Self {
        Self::Status(Status::Forbidden, reason.to_string())
    }

    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn internal(reason: impl Display) -> Self {
        Self::Status(Status::InternalServerError, reason.to_string())
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Status(status, _) => *status,
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::Db(err) if is_duplicate_key_error(err) => Status::BadRequest,
            Self::Db(_) | Self::BsonSer(_) | Self::Json(_) | Self::Csv(_) | Self::Argon2(_) => {
                Status::InternalServerError
            }
            Self::OidParse(_) => Status::BadRequest,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::InternalServerError,
            },
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{} {}: {}", req.method(), req.uri(), self);
        } else {
            warn!("{} {}: {} ({})", req.method(), req.uri(), self, status);
        }
        match self {
            Self::Validation(errors) => (status, Json(errors)).respond_to(req),
            _ => Err(status),
        }
    }
}
