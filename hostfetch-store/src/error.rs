//! Store error types.

use thiserror::Error;

/// Errors that can occur while reading or writing caches.
///
/// Cache callers log these and carry on; they never fail a fetch.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cache file name that does not follow the expected layout.
    #[error("Invalid cache file name: {0}")]
    InvalidFileName(String),

    /// Domain model error.
    #[error(transparent)]
    Core(#[from] hostfetch_core::CoreError),
}

impl StoreError {
    /// Returns true if the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
