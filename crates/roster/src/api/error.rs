//! Wire-level error taxonomy for the resource API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::Error;

/// An error as reported to HTTP clients.
///
/// Internal detail never crosses this boundary; only validation text and
/// duplicate-key fields are passed through.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The path id is not a well-formed key.
    InvalidId,
    /// No record has this id.
    NotFound,
    /// The request violated the record schema.
    Validation(String),
    /// A unique constraint collided.
    DuplicateKey(serde_json::Map<String, serde_json::Value>),
    /// Anything unexpected, including an unavailable store.
    Server,
}

impl ApiError {
    /// The error code placed in the `error` field of the body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidId => "invalid_id",
            Self::NotFound => "not_found",
            Self::Validation(_) => "validation_error",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::Server => "server_error",
        }
    }

    /// The HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidId | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DuplicateKey(_) => StatusCode::CONFLICT,
            Self::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The JSON body sent to the client.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        match self {
            Self::Validation(details) => json!({ "error": self.code(), "details": details }),
            Self::DuplicateKey(fields) => json!({ "error": self.code(), "fields": fields }),
            _ => json!({ "error": self.code() }),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidId(_) => Self::InvalidId,
            Error::NotFound(_) => Self::NotFound,
            Error::Validation(v) => Self::Validation(v.to_string()),
            Error::DuplicateKey { fields } => Self::DuplicateKey(fields),
            _ => Self::Server,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
