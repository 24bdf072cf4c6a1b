//! Error types for the memory store.

use thiserror::Error;

/// Result type alias using the memory store's error type.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Errors surfaced by the memory store.
///
/// Lookups of ids that no longer exist are not errors; they come back as
/// `None` or an empty collection because forgetting races with lookups.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Input rejected at the boundary, before any mutation.
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Malformed snapshot. Imports are atomic, so the store is untouched.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON encoding/decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A shared store's lock was poisoned by a panicking holder.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl MemoryError {
    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error was raised by boundary validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this error came from decoding a snapshot.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization(_) | Self::Json(_))
    }
}
