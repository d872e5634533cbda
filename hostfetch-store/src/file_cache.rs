//! Byte-level caches of whole fetch results.
//!
//! [`DiskFileCache`] keeps the last payload of a host in one file and
//! hands it back while it is young enough for the current mode.
//! [`NoCache`] is used for data sources that are never cached.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use hostfetch_core::{AgentRawData, HostName, Mode, SnmpRawData};
use hostfetch_fetch::FileCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::error::StoreError;
use crate::persistence::{load_bytes, save_bytes};

// ============================================================================
// Configuration
// ============================================================================

/// Maximum age in seconds of a usable cache file, per mode.
///
/// Modes without a field never use the cache. Zero disables the cache for
/// that mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxAge {
    /// Checking mode.
    pub checking: u64,
    /// Discovery mode.
    pub discovery: u64,
    /// Inventory mode.
    pub inventory: u64,
}

impl MaxAge {
    /// A cache that is never read by age.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns the maximum age for a mode.
    pub fn get(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Checking => self.checking,
            Mode::Discovery => self.discovery,
            Mode::Inventory => self.inventory,
            Mode::None | Mode::Rtc | Mode::ForceSections => 0,
        }
    }
}

/// Which directions of the cache are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheMode {
    /// Cached payloads may be read.
    pub read: bool,
    /// Fresh payloads are written.
    pub write: bool,
}

impl Default for FileCacheMode {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}

impl FileCacheMode {
    /// Neither read nor write.
    pub fn disabled() -> Self {
        Self {
            read: false,
            write: false,
        }
    }
}

/// Configuration of a [`DiskFileCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    /// Directory holding one cache file per host.
    pub directory: Option<PathBuf>,
    /// Maximum age per mode.
    pub max_age: MaxAge,
    /// Enabled directions.
    pub mode: FileCacheMode,
    /// Offline mode: read regardless of age, never write.
    pub simulation: bool,
    /// Read regardless of age and never fetch.
    pub use_only_cache: bool,
}

// ============================================================================
// Payload Codec
// ============================================================================

/// How a payload is stored in its cache file.
pub trait RawCodec: Sized + Send + Sync {
    /// Serializes the payload.
    fn encode(&self) -> Result<Vec<u8>, StoreError>;
    /// Deserializes the payload.
    fn decode(bytes: &[u8]) -> Result<Self, StoreError>;
}

/// Agent output is stored verbatim.
impl RawCodec for AgentRawData {
    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.as_bytes().to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(AgentRawData::from(bytes))
    }
}

/// SNMP results are stored as JSON keyed by section marker.
impl RawCodec for SnmpRawData {
    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ============================================================================
// Disk File Cache
// ============================================================================

/// Cache of a host's last payload in a single file.
#[derive(Debug, Clone)]
pub struct DiskFileCache<T> {
    hostname: HostName,
    path: PathBuf,
    max_age: MaxAge,
    mode: FileCacheMode,
    simulation: bool,
    use_only_cache: bool,
    _payload: PhantomData<fn() -> T>,
}

impl<T> DiskFileCache<T> {
    /// Creates a cache stored at `path`.
    pub fn new(hostname: HostName, path: impl Into<PathBuf>) -> Self {
        Self {
            hostname,
            path: path.into(),
            max_age: MaxAge::none(),
            mode: FileCacheMode::default(),
            simulation: false,
            use_only_cache: false,
            _payload: PhantomData,
        }
    }

    /// Creates a cache for `hostname` inside `directory` using `config`.
    pub fn from_config(hostname: HostName, directory: &Path, config: &FileCacheConfig) -> Self {
        let path = directory.join(hostname.as_str());
        Self::new(hostname, path)
            .with_max_age(config.max_age)
            .with_mode(config.mode)
            .with_simulation(config.simulation)
            .with_use_only_cache(config.use_only_cache)
    }

    /// Sets the maximum age per mode.
    #[must_use]
    pub fn with_max_age(mut self, max_age: MaxAge) -> Self {
        self.max_age = max_age;
        self
    }

    /// Sets the enabled directions.
    #[must_use]
    pub fn with_mode(mut self, mode: FileCacheMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables offline mode.
    #[must_use]
    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }

    /// Restricts the trigger to cached data.
    #[must_use]
    pub fn with_use_only_cache(mut self, use_only_cache: bool) -> Self {
        self.use_only_cache = use_only_cache;
        self
    }

    /// The cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether age is ignored when reading.
    fn ignores_age(&self) -> bool {
        self.simulation || self.use_only_cache
    }

    /// Age of the cache file in seconds, or `None` if it does not exist.
    async fn age(&self) -> Option<u64> {
        let modified = tokio::fs::metadata(&self.path).await.ok()?.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .map_or(0, |age| age.as_secs()),
        )
    }
}

#[async_trait]
impl<T: RawCodec> FileCache<T> for DiskFileCache<T> {
    fn hostname(&self) -> &HostName {
        &self.hostname
    }

    fn simulation(&self) -> bool {
        self.simulation
    }

    fn use_only_cache(&self) -> bool {
        self.use_only_cache
    }

    #[instrument(skip(self), fields(host = %self.hostname, path = %self.path.display()))]
    async fn read(&self, mode: Mode) -> Option<T> {
        if !self.mode.read {
            trace!("Cache reading disabled");
            return None;
        }

        let max_age = self.max_age.get(mode);
        if !self.ignores_age() && max_age == 0 {
            trace!("Cache disabled for mode");
            return None;
        }

        let age = self.age().await?;
        if !self.ignores_age() && age > max_age {
            debug!(age, max_age, "Cache file too old");
            return None;
        }

        let bytes = match load_bytes(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to read cache file");
                return None;
            }
        };
        if bytes.is_empty() {
            debug!("Cache file is empty");
            return None;
        }

        match T::decode(&bytes) {
            Ok(raw) => {
                debug!(age, "Using cache file");
                Some(raw)
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cache file");
                None
            }
        }
    }

    #[instrument(skip(self, raw), fields(host = %self.hostname, path = %self.path.display()))]
    async fn write(&self, raw: &T, mode: Mode) {
        if !self.mode.write || self.simulation {
            trace!("Cache writing disabled");
            return;
        }

        let bytes = match raw.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode payload");
                return;
            }
        };

        match save_bytes(&self.path, &bytes).await {
            Ok(()) => debug!(mode = %mode, len = bytes.len(), "Cache file written"),
            Err(e) => warn!(error = %e, "Failed to write cache file"),
        }
    }
}

// ============================================================================
// No Cache
// ============================================================================

/// A cache that never hits and never stores.
#[derive(Debug, Clone)]
pub struct NoCache<T> {
    hostname: HostName,
    simulation: bool,
    _payload: PhantomData<fn() -> T>,
}

impl<T> NoCache<T> {
    /// Creates a pass-through cache.
    pub fn new(hostname: HostName) -> Self {
        Self {
            hostname,
            simulation: false,
            _payload: PhantomData,
        }
    }

    /// Enables offline mode, in which every fetch fails for lack of data.
    #[must_use]
    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }
}

#[async_trait]
impl<T: Send + Sync> FileCache<T> for NoCache<T> {
    fn hostname(&self) -> &HostName {
        &self.hostname
    }

    fn simulation(&self) -> bool {
        self.simulation
    }

    fn use_only_cache(&self) -> bool {
        false
    }

    async fn read(&self, _mode: Mode) -> Option<T> {
        None
    }

    async fn write(&self, _raw: &T, _mode: Mode) {}
}

// ============================================================================
// Tests
// ============================================================================
