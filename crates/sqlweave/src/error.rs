//! Error types for sqlweave

use crate::value::Value;
use thiserror::Error;

/// Result type alias for sqlweave operations
pub type QbResult<T> = Result<T, QbError>;

/// Error types for query building and execution
#[derive(Debug, Clone, Error)]
pub enum QbError {
    /// Malformed builder input (bad operator/value pair, unknown binding
    /// category, missing table or columns, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The active dialect cannot express the requested statement shape
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The executor failed to run a statement
    #[error("Query failed: {message} (SQL: {sql})")]
    QueryFailed {
        sql: String,
        bindings: Vec<Value>,
        message: String,
    },

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl QbError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an unsupported-statement error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a query failure carrying the statement that was attempted
    pub fn query_failed(
        sql: impl Into<String>,
        bindings: Vec<Value>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueryFailed {
            sql: sql.into(),
            bindings,
            message: message.into(),
        }
    }

    /// Attach statement context to an error raised while executing it.
    ///
    /// Errors that already carry context, and builder-side errors, pass through unchanged.
    pub fn into_query_failed(self, sql: &str, bindings: &[Value]) -> Self {
        match self {
            Self::Connection(message) | Self::Other(message) => Self::QueryFailed {
                sql: sql.to_string(),
                bindings: bindings.to_vec(),
                message,
            },
            other => other,
        }
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this is an unsupported-statement error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Check if this is a query failure
    pub fn is_query_failed(&self) -> bool {
        matches!(self, Self::QueryFailed { .. })
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for QbError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Other(err.to_string())
    }
}
