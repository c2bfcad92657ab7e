//! Core error types for murmur-core.
//!
//! The evaluation loop never propagates errors to its caller; everything
//! defined here is either surfaced through an [`crate::traits::ErrorReporter`]
//! or returned from the fallible setup/storage APIs.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for murmur-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Trigger-engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// A context modality the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Location,
    Time,
    Notification,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Location => write!(f, "location"),
            Modality::Time => write!(f, "time"),
            Modality::Notification => write!(f, "notification"),
        }
    }
}

/// Trigger-engine errors.
///
/// None of these crash the evaluation loop. A `PermissionDenied` disables
/// one modality while the engine keeps evaluating the other; the rest are
/// recoverable per-event or per-condition.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The host denied a capability. Fatal to that modality only.
    #[error("Permission denied for {modality} capability")]
    PermissionDenied { modality: Modality },

    /// The dispatch sink failed; retried on the next context event.
    #[error("Dispatch failed for condition '{condition_id}': {message}")]
    DispatchFailure {
        condition_id: String,
        message: String,
    },

    /// Repeated dispatch failures for the same condition.
    #[error("Dispatch failed {attempts} consecutive times for condition '{condition_id}'")]
    DispatchExhausted {
        condition_id: String,
        attempts: u32,
    },

    /// A condition that cannot be matched (skipped, never fatal).
    #[error("Malformed condition '{condition_id}': {message}")]
    MalformedCondition {
        condition_id: String,
        message: String,
    },

    /// The condition store could not be synced; the engine keeps its
    /// last known snapshot.
    #[error("Condition store sync failed: {0}")]
    StoreSyncFailure(String),

    /// Marking fired-state on the note store failed (best effort).
    #[error("Failed to mark note '{note_id}' fired: {message}")]
    MarkFiredFailure { note_id: String, message: String },

    /// The dedup ledger could not be read or written.
    #[error("Dedup ledger error: {0}")]
    Ledger(#[from] DatabaseError),
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
