//! Error types for roster.
//!
//! This module defines the error type shared by the record store, the
//! resource API and the client, along with the structured validation error
//! produced before anything is persisted.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// The main error type for roster operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: r2d2::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// No pooled connection could be checked out.
    #[error("database connection unavailable: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Record Errors ===
    /// The supplied identifier is not a well-formed record key.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// No record exists with the given identifier.
    #[error("student not found: {0}")]
    NotFound(String),

    /// A record failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A unique constraint was violated.
    #[error("duplicate key on {}", .fields.keys().cloned().collect::<Vec<_>>().join(", "))]
    DuplicateKey {
        /// The offending field names and values.
        fields: serde_json::Map<String, serde_json::Value>,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Client Errors ===
    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("server responded {status}: {code}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from the response body (e.g. `not_found`).
        code: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for roster operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a not-found error for the given id.
    #[must_use]
    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::NotFound(id.to_string())
    }

    /// Create a duplicate key error for a single field.
    #[must_use]
    pub fn duplicate_key(field: impl Into<String>, value: serde_json::Value) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert(field.into(), value);
        Self::DuplicateKey { fields }
    }

    /// Check if this error means the record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Api { status: 404, .. })
    }

    /// Check if this error is a schema violation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Human-readable description of the problem.
    pub message: String,
}

/// Schema violation detected before persistence.
///
/// Collects every failing field so a single response can report all of
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    /// Create an empty validation error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validation error that is not tied to a record field.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push("body", message);
        err
    }

    /// Record a failure for `field`.
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// The recorded field failures.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn the collected failures into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns `self` if at least one failure was recorded.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
