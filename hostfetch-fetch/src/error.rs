//! Fault taxonomy for fetch operations.
//!
//! Three categories exist:
//!
//! - [`Cancelled`]: the platform timeout/shutdown signal. Never converted
//!   into a value; every layer hands it back to its caller unchanged.
//! - [`FetcherError`]: every other failure while opening, detecting or
//!   retrieving data. Crosses the fetcher boundary as a value.
//! - Cache faults: logged and treated as a miss, so they have no type here.
//!
//! Inside a fetcher both travel as [`FetchFailure`]; at the boundary they
//! are split into `Result<FetchResult<T>, Cancelled>`.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Cancellation
// ============================================================================

/// The platform cancellation signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cancelled: {reason}")]
pub struct Cancelled {
    /// Why the operation was cancelled.
    pub reason: String,
}

impl Cancelled {
    /// Creates a cancellation with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Cancellation caused by an expired deadline.
    pub fn timeout(after: Duration) -> Self {
        Self::new(format!("timed out after {after:?}"))
    }
}

// ============================================================================
// Fetcher Error
// ============================================================================

/// A fetcher fault.
///
/// Faults without payload display their kind name; faults with payload
/// display the payload.
#[derive(Debug, Error)]
pub enum FetcherError {
    /// The backend was used before `open()` or after `close()`.
    #[error("MissingBackend")]
    MissingBackend,

    /// A protocol-level timeout.
    #[error("{0}")]
    Timeout(String),

    /// SNMP protocol or detection failure.
    #[error("{0}")]
    Snmp(String),

    /// Connection to an agent failed.
    #[error("{0}")]
    Connection(String),

    /// External program failure.
    #[error("{0}")]
    Program(String),

    /// Neither cache nor device delivered data.
    #[error("{0}")]
    NoData(String),

    /// Secret material could not be provisioned.
    #[error("{0}")]
    Secrets(#[from] SecretsError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl FetcherError {
    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingBackend => "MissingBackend",
            Self::Timeout(_) => "Timeout",
            Self::Snmp(_) => "Snmp",
            Self::Connection(_) => "Connection",
            Self::Program(_) => "Program",
            Self::NoData(_) => "NoData",
            Self::Secrets(_) => "Secrets",
            Self::Io(_) => "Io",
            Self::Other(_) => "Other",
        }
    }
}

// ============================================================================
// Secrets Error
// ============================================================================

/// Error type for secret provisioning.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// Secret not present in the keychain.
    #[error("Secret not found for {service}/{account}")]
    NotFound {
        /// Service name.
        service: String,
        /// Account name.
        account: String,
    },

    /// Keychain platform failure.
    #[error("Keychain error: {0}")]
    Keychain(String),

    /// IO error while writing or removing the secrets file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<keyring::Error> for SecretsError {
    fn from(err: keyring::Error) -> Self {
        SecretsError::Keychain(err.to_string())
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for subprocess execution.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Executable not on PATH.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Process did not finish in time.
    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    /// IO error while spawning or talking to the process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Trigger Error
// ============================================================================

/// Error rebuilding a trigger from serialized parameters.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// No trigger variant with this ident.
    #[error("Unknown trigger: {0}")]
    UnknownTrigger(String),

    /// Parameters do not match the variant.
    #[error("Invalid trigger parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),
}

// ============================================================================
// Fetch Failure
// ============================================================================

/// Internal failure of a fetch step: cancellation or a fetcher fault.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// Must propagate unchanged.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Converted into a value at the boundary.
    #[error(transparent)]
    Error(#[from] FetcherError),
}

impl From<std::io::Error> for FetchFailure {
    fn from(err: std::io::Error) -> Self {
        FetchFailure::Error(FetcherError::Io(err))
    }
}

impl From<SecretsError> for FetchFailure {
    fn from(err: SecretsError) -> Self {
        FetchFailure::Error(FetcherError::Secrets(err))
    }
}

impl FetchFailure {
    /// Splits an internal result at the fetcher boundary.
    ///
    /// Fetcher faults become `Ok(Err(_))`; cancellation stays the outer
    /// error so `?` keeps propagating it.
    pub fn settle<T>(result: Result<T, FetchFailure>) -> Result<FetchResult<T>, Cancelled> {
        match result {
            Ok(value) => Ok(Ok(value)),
            Err(FetchFailure::Error(err)) => Ok(Err(err)),
            Err(FetchFailure::Cancelled(cancelled)) => Err(cancelled),
        }
    }
}

/// Result value handed to callers: payload or fetcher fault.
pub type FetchResult<T> = Result<T, FetcherError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payloadless_message_is_kind_name() {
        assert_eq!(FetcherError::MissingBackend.to_string(), "MissingBackend");
    }

    #[test]
    fn test_payload_message_is_payload() {
        assert_eq!(
            FetcherError::Timeout("SNMP timeout after 5s".to_string()).to_string(),
            "SNMP timeout after 5s"
        );
        assert_eq!(FetcherError::Snmp("boom".to_string()).kind(), "Snmp");
    }

    #[test]
    fn test_settle_splits_cancellation() {
        let ok: Result<u8, FetchFailure> = Ok(1);
        assert!(matches!(FetchFailure::settle(ok), Ok(Ok(1))));

        let fault: Result<u8, FetchFailure> = Err(FetcherError::MissingBackend.into());
        assert!(matches!(
            FetchFailure::settle(fault),
            Ok(Err(FetcherError::MissingBackend))
        ));

        let cancelled: Result<u8, FetchFailure> = Err(Cancelled::new("shutdown").into());
        assert_eq!(
            FetchFailure::settle(cancelled).unwrap_err(),
            Cancelled::new("shutdown")
        );
    }
}
