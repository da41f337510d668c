//! Error types for SqlPad
//!
//! This module defines the crate-wide error type. Engine failures are kept as
//! the engine's own message so they can be shown (and located) verbatim.

use thiserror::Error;

/// The main error type for SqlPad
#[derive(Error, Debug)]
pub enum Error {
    // ========== Engine Errors ==========
    /// A statement was rejected by the engine. The message is the engine's own.
    #[error("{0}")]
    Engine(String),

    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' not found")]
    TableNotFound(String),

    // ========== Configuration Errors ==========
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config error: invalid JSON - {0}")]
    Json(#[from] serde_json::Error),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Pipeline Errors ==========
    #[error("Pipeline error: schema pipeline is no longer running")]
    PipelineClosed,

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The message handed to error-display consumers.
    ///
    /// Engine errors surface their raw text; everything else its display form.
    pub fn message(&self) -> String {
        match self {
            Error::Engine(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => Error::Engine(msg),
            other => Error::Engine(other.to_string()),
        }
    }
}

/// Result type alias for SqlPad operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Engine("near \"INTEGR\": syntax error".to_string());
        assert_eq!(err.to_string(), "near \"INTEGR\": syntax error");
        assert_eq!(err.message(), "near \"INTEGR\": syntax error");

        let err = Error::Config("debounce_ms must be greater than zero".to_string());
        assert_eq!(
            err.to_string(),
            "Config error: debounce_ms must be greater than zero"
        );
    }

    #[test]
    fn test_sqlite_failure_keeps_engine_message() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: Error = conn
            .execute_batch("CREATE TABLE t (id INTEGR PRIMARY KEY,);")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Engine(_)));
        assert!(err.message().contains("near \")\""));
    }
}
