//! The fetcher contract.
//!
//! A fetcher retrieves one raw payload from one data source (SNMP device,
//! TCP agent, external program, piggyback directory). Implementations only
//! provide [`Fetcher::open`], [`Fetcher::close`] and
//! [`Fetcher::fetch_from_io`]; callers only use [`FetcherExt::fetch`],
//! which is implemented once for every fetcher and cannot be overridden.

use async_trait::async_trait;
use hostfetch_core::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::error::{Cancelled, FetchFailure, FetchResult};

// ============================================================================
// Fetcher Type
// ============================================================================

/// The family a fetcher belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetcherType {
    /// SNMP device.
    Snmp,
    /// TCP agent.
    Tcp,
    /// External data-source program.
    Program,
    /// Piggybacked data delivered by other hosts.
    Piggyback,
}

impl FetcherType {
    /// Returns the display name for this type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Snmp => "SNMP",
            Self::Tcp => "TCP",
            Self::Program => "Program",
            Self::Piggyback => "Piggyback",
        }
    }
}

impl fmt::Display for FetcherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Fetcher Trait
// ============================================================================

/// A data source that can be opened, read once, and closed.
///
/// ## Implementing a Fetcher
///
/// ```ignore
/// struct EchoFetcher { conn: Option<Connection> }
///
/// #[async_trait]
/// impl Fetcher for EchoFetcher {
///     type RawData = AgentRawData;
///
///     fn fetcher_type(&self) -> FetcherType {
///         FetcherType::Tcp
///     }
///
///     async fn open(&mut self) -> Result<(), FetchFailure> {
///         self.conn = Some(Connection::connect().await?);
///         Ok(())
///     }
///
///     async fn close(&mut self) {
///         self.conn = None;
///     }
///
///     async fn fetch_from_io(&mut self, _mode: Mode) -> Result<AgentRawData, FetchFailure> {
///         let conn = self.conn.as_mut().ok_or(FetcherError::MissingBackend)?;
///         Ok(conn.read_all().await?.into())
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher: Send {
    /// The payload this fetcher produces.
    type RawData: Send + Sync + 'static;

    /// The family of this fetcher.
    fn fetcher_type(&self) -> FetcherType;

    /// Acquires the underlying resource (socket, session, process).
    async fn open(&mut self) -> Result<(), FetchFailure>;

    /// Releases the underlying resource.
    ///
    /// Must be idempotent and must not fail.
    async fn close(&mut self);

    /// Retrieves the payload. Only called between `open` and `close`.
    async fn fetch_from_io(&mut self, mode: Mode) -> Result<Self::RawData, FetchFailure>;
}

// ============================================================================
// Fetch Wrapper
// ============================================================================

/// The single entry point callers use on a fetcher.
#[async_trait]
pub trait FetcherExt: Fetcher {
    /// Opens, fetches and closes.
    ///
    /// Fetcher faults from `open` or `fetch_from_io` come back as
    /// `Ok(Err(_))`. Cancellation comes back as the outer `Err`.
    /// `close` runs on every path.
    async fn fetch(&mut self, mode: Mode) -> Result<FetchResult<Self::RawData>, Cancelled>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> FetcherExt for F {
    #[instrument(skip(self), fields(fetcher = %self.fetcher_type(), mode = %mode))]
    async fn fetch(&mut self, mode: Mode) -> Result<FetchResult<Self::RawData>, Cancelled> {
        let result = match self.open().await {
            Ok(()) => self.fetch_from_io(mode).await,
            Err(failure) => Err(failure),
        };
        self.close().await;

        match &result {
            Ok(_) => debug!("Fetch succeeded"),
            Err(FetchFailure::Error(err)) => {
                warn!(kind = err.kind(), error = %err, "Fetch failed");
            }
            Err(FetchFailure::Cancelled(cancelled)) => {
                debug!(reason = %cancelled.reason, "Fetch cancelled");
            }
        }

        FetchFailure::settle(result)
    }
}

// ============================================================================
// Tests
// ============================================================================
