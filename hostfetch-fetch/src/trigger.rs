//! Fetcher triggers.
//!
//! A trigger turns "maybe cached, maybe needs live IO, maybe needs
//! secrets" into one result value. [`FetcherTrigger::get_raw_data`] is the
//! same for every variant; variants only differ in how they run the
//! fetcher itself ([`FetcherTrigger::fetch`]).
//!
//! Triggers can cross a process boundary: each serializes its construction
//! parameters into a string-keyed mapping and is rebuilt from its ident and
//! that mapping via [`AnyTrigger::from_params`].

use std::time::Duration;

use async_trait::async_trait;
use hostfetch_core::Mode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::{Cancelled, FetchResult, FetcherError, TriggerError};
use crate::fetcher::{Fetcher, FetcherExt};
use crate::file_cache::FileCache;
use crate::host::secrets::SecretsProvider;

/// Construction parameters of a trigger.
pub type TriggerParams = Map<String, Value>;

// ============================================================================
// Trigger Trait
// ============================================================================

/// Orchestrates file cache, secrets and fetcher for one fetch.
#[async_trait]
pub trait FetcherTrigger: Send + Sync {
    /// Stable identifier of the variant.
    fn ident(&self) -> &'static str;

    /// Construction parameters.
    fn serialized_params(&self) -> TriggerParams;

    /// Rebuilds a trigger of this variant from its parameters.
    fn from_params(params: &TriggerParams) -> Result<Self, TriggerError>
    where
        Self: Sized;

    /// Runs the fetcher. Called with secrets already provisioned.
    async fn fetch<F: Fetcher>(
        &self,
        fetcher: &mut F,
        mode: Mode,
    ) -> Result<FetchResult<F::RawData>, Cancelled>;

    /// Two triggers are the same if variant and parameters match.
    fn same_as(&self, other: &dyn TriggerIdentity) -> bool {
        self.ident() == other.trigger_ident() && self.serialized_params() == other.trigger_params()
    }

    /// Returns the payload from `file_cache` or a fresh fetch.
    ///
    /// A cache hit returns immediately without provisioning secrets or
    /// opening the fetcher. Fresh payloads are written back to the cache.
    /// Cancellation is the outer `Err`; every other fault is `Ok(Err(_))`.
    #[instrument(
        skip_all,
        fields(host = %file_cache.hostname(), trigger = self.ident(), mode = %mode)
    )]
    async fn get_raw_data<F, C, S>(
        &self,
        file_cache: &C,
        fetcher: &mut F,
        mode: Mode,
        secrets: &S,
    ) -> Result<FetchResult<F::RawData>, Cancelled>
    where
        F: Fetcher,
        C: FileCache<F::RawData> + ?Sized,
        S: SecretsProvider + ?Sized,
    {
        if let Some(cached) = file_cache.read(mode).await {
            debug!("Using cached data");
            return Ok(Ok(cached));
        }

        if file_cache.simulation() {
            return Ok(Err(FetcherError::NoData(
                "Got no data (Simulation mode enabled and no cached data present)".to_string(),
            )));
        }

        if file_cache.use_only_cache() {
            return Ok(Err(FetcherError::NoData(
                "Got no data (use only cache and no usable cache file present)".to_string(),
            )));
        }

        let secret_file = match secrets.provide_file().await {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "Failed to provision secrets");
                return Ok(Err(e.into()));
            }
        };

        let result = self.fetch(fetcher, mode).await?;
        drop(secret_file);

        if let Ok(raw) = &result {
            file_cache.write(raw, mode).await;
        }
        Ok(result)
    }
}

/// Object-safe view of a trigger's identity, used for comparisons.
pub trait TriggerIdentity {
    /// See [`FetcherTrigger::ident`].
    fn trigger_ident(&self) -> &'static str;
    /// See [`FetcherTrigger::serialized_params`].
    fn trigger_params(&self) -> TriggerParams;
}

impl<T: FetcherTrigger> TriggerIdentity for T {
    fn trigger_ident(&self) -> &'static str {
        self.ident()
    }

    fn trigger_params(&self) -> TriggerParams {
        self.serialized_params()
    }
}

// ============================================================================
// Plain Trigger
// ============================================================================

/// Runs the fetcher directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainFetcherTrigger;

impl PlainFetcherTrigger {
    /// Identifier used in serialized form.
    pub const IDENT: &'static str = "plain";
}

#[async_trait]
impl FetcherTrigger for PlainFetcherTrigger {
    fn ident(&self) -> &'static str {
        Self::IDENT
    }

    fn serialized_params(&self) -> TriggerParams {
        TriggerParams::new()
    }

    fn from_params(_params: &TriggerParams) -> Result<Self, TriggerError> {
        Ok(Self)
    }

    async fn fetch<F: Fetcher>(
        &self,
        fetcher: &mut F,
        mode: Mode,
    ) -> Result<FetchResult<F::RawData>, Cancelled> {
        fetcher.fetch(mode).await
    }
}

// ============================================================================
// Timeout Trigger
// ============================================================================

/// Runs the fetcher under a deadline.
///
/// When the deadline expires the fetch is abandoned, the fetcher is
/// closed and [`Cancelled`] is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutFetcherTrigger {
    /// Deadline in seconds.
    pub timeout: u64,
}

impl TimeoutFetcherTrigger {
    /// Identifier used in serialized form.
    pub const IDENT: &'static str = "timeout";

    /// Creates a trigger with the given deadline in seconds.
    pub fn new(timeout: u64) -> Self {
        Self { timeout }
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[async_trait]
impl FetcherTrigger for TimeoutFetcherTrigger {
    fn ident(&self) -> &'static str {
        Self::IDENT
    }

    fn serialized_params(&self) -> TriggerParams {
        let mut params = TriggerParams::new();
        params.insert("timeout".to_string(), Value::from(self.timeout));
        params
    }

    fn from_params(params: &TriggerParams) -> Result<Self, TriggerError> {
        Ok(serde_json::from_value(Value::Object(params.clone()))?)
    }

    async fn fetch<F: Fetcher>(
        &self,
        fetcher: &mut F,
        mode: Mode,
    ) -> Result<FetchResult<F::RawData>, Cancelled> {
        let deadline = self.deadline();
        let outcome = tokio::time::timeout(deadline, fetcher.fetch(mode)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                info!(timeout = ?deadline, "Fetch deadline expired");
                // The abandoned future never reached its own close().
                fetcher.close().await;
                Err(Cancelled::timeout(deadline))
            }
        }
    }
}

// ============================================================================
// Any Trigger
// ============================================================================

/// One of the known trigger variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyTrigger {
    /// See [`PlainFetcherTrigger`].
    Plain(PlainFetcherTrigger),
    /// See [`TimeoutFetcherTrigger`].
    Timeout(TimeoutFetcherTrigger),
}

impl Default for AnyTrigger {
    fn default() -> Self {
        Self::Plain(PlainFetcherTrigger)
    }
}

impl AnyTrigger {
    /// Rebuilds a trigger from its ident and parameters.
    pub fn from_ident(ident: &str, params: &TriggerParams) -> Result<Self, TriggerError> {
        match ident {
            PlainFetcherTrigger::IDENT => Ok(Self::Plain(PlainFetcherTrigger::from_params(params)?)),
            TimeoutFetcherTrigger::IDENT => {
                Ok(Self::Timeout(TimeoutFetcherTrigger::from_params(params)?))
            }
            other => Err(TriggerError::UnknownTrigger(other.to_string())),
        }
    }
}

#[async_trait]
impl FetcherTrigger for AnyTrigger {
    fn ident(&self) -> &'static str {
        match self {
            Self::Plain(t) => t.ident(),
            Self::Timeout(t) => t.ident(),
        }
    }

    fn serialized_params(&self) -> TriggerParams {
        match self {
            Self::Plain(t) => t.serialized_params(),
            Self::Timeout(t) => t.serialized_params(),
        }
    }

    /// Picks the variant from the parameters: a `timeout` key selects
    /// [`TimeoutFetcherTrigger`]. Use [`AnyTrigger::from_ident`] when the
    /// ident is known.
    fn from_params(params: &TriggerParams) -> Result<Self, TriggerError> {
        if params.contains_key("timeout") {
            Self::from_ident(TimeoutFetcherTrigger::IDENT, params)
        } else {
            Self::from_ident(PlainFetcherTrigger::IDENT, params)
        }
    }

    async fn fetch<F: Fetcher>(
        &self,
        fetcher: &mut F,
        mode: Mode,
    ) -> Result<FetchResult<F::RawData>, Cancelled> {
        match self {
            Self::Plain(t) => t.fetch(fetcher, mode).await,
            Self::Timeout(t) => t.fetch(fetcher, mode).await,
        }
    }
}
