//! Core error types for breathwork-core.
//!
//! Only [`SessionError::InvalidConfiguration`] is meant to reach callers of
//! engine operations. Everything else is logged and degraded locally.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathwork-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session engine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted state errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the session engine and its audio collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Rejected at `start()`; the session never begins.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Narration asset missing, audio device blocked or speech failure.
    #[error("{resource} unavailable: {message}")]
    ResourceUnavailable { resource: String, message: String },
}

impl SessionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SessionError::InvalidConfiguration(message.into())
    }

    pub fn unavailable(resource: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::ResourceUnavailable {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Errors reading persisted JSON state.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Stored value exists but does not parse. Callers treat it as empty.
    #[error("Stored value under '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
