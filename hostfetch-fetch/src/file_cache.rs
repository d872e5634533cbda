//! Contract of the byte-level result cache consulted by triggers.
//!
//! The cache stores the complete payload of a previous fetch for a host.
//! Implementations live in `hostfetch-store`; failing to read or write is
//! never an error here, it is a miss or a skipped write.

use async_trait::async_trait;
use hostfetch_core::{HostName, Mode};

/// Cache for whole fetch results of one host.
#[async_trait]
pub trait FileCache<T: Send + Sync>: Send + Sync {
    /// The host this cache belongs to.
    fn hostname(&self) -> &HostName;

    /// Offline mode: never attempt live IO.
    fn simulation(&self) -> bool;

    /// Only cached data may be used.
    fn use_only_cache(&self) -> bool;

    /// Returns a usable cached payload for `mode`, if any.
    async fn read(&self, mode: Mode) -> Option<T>;

    /// Stores a freshly fetched payload.
    async fn write(&self, raw: &T, mode: Mode);
}
