//! Core error types for hostfetch.

use thiserror::Error;

/// Core error type for model construction and conversion.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A section name did not match `[A-Za-z0-9_.]+`.
    #[error("Invalid section name: {0:?}")]
    InvalidSectionName(String),

    /// A host name was empty or contained a path separator.
    #[error("Invalid host name: {0:?}")]
    InvalidHostName(String),

    /// A section marker string could not be parsed.
    #[error("Invalid section marker: {0:?}")]
    InvalidMarker(String),

    /// A key-value mapping lacked a required key or had a wrong type.
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
