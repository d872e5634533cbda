//! SNMP backends.
//!
//! A backend answers `get` and `walk` requests for one host. It is created
//! in `SnmpFetcher::open` and dropped in `close`; protocol implementations
//! are supplied by the caller through a [`BackendFactory`]. The
//! [`StoredWalkBackend`] replays a walk previously saved to disk.

use std::path::Path;

use async_trait::async_trait;
use hostfetch_core::{HostName, SnmpRowInfo, SnmpValue};
use hostfetch_fetch::{FetchFailure, FetcherError};
use tracing::{debug, instrument, trace};

use super::config::{SnmpBackendKind, SnmpHostConfig};

// ============================================================================
// Backend Trait
// ============================================================================

/// Access to the SNMP data of one device.
///
/// Requests are issued one at a time; `&mut self` keeps a backend from
/// being used by two fetches at once.
#[async_trait]
pub trait SnmpBackend: Send {
    /// The host this backend talks to.
    fn hostname(&self) -> &HostName;

    /// Reads a single OID. `None` if the device has no such object.
    async fn get(&mut self, oid: &str, context: &str) -> Result<Option<SnmpValue>, FetchFailure>;

    /// Walks the subtree below `oid`. Rows are `(full oid, value)` in
    /// device order.
    async fn walk(&mut self, oid: &str, context: &str) -> Result<SnmpRowInfo, FetchFailure>;
}

/// Creates protocol backends that are not built into this crate.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Opens a backend of `kind` for `host`.
    async fn create(
        &self,
        kind: SnmpBackendKind,
        host: &SnmpHostConfig,
    ) -> Result<Box<dyn SnmpBackend>, FetchFailure>;
}

/// Whether `oid` lies in the subtree rooted at `base` (or is `base`).
pub(crate) fn oid_in_subtree(oid: &str, base: &str) -> bool {
    let base = base.trim_end_matches('.');
    oid == base
        || oid
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('.'))
}

// ============================================================================
// Stored Walk Backend
// ============================================================================

/// Replays a walk file.
///
/// The file has one `OID value` pair per line; values may be wrapped in
/// double quotes. Empty lines are skipped. Contexts are ignored.
#[derive(Debug, Clone)]
pub struct StoredWalkBackend {
    hostname: HostName,
    rows: SnmpRowInfo,
}

impl StoredWalkBackend {
    /// Reads the walk file of `hostname`.
    ///
    /// A missing or unreadable file is a fetcher fault.
    #[instrument(skip_all, fields(host = %hostname, path = %path.display()))]
    pub async fn open(hostname: HostName, path: &Path) -> Result<Self, FetchFailure> {
        let content = tokio::fs::read(path).await.map_err(|e| {
            FetcherError::Snmp(format!(
                "Cannot read stored walk {}: {e}",
                path.display()
            ))
        })?;
        let backend = Self::from_text(hostname, &String::from_utf8_lossy(&content));
        debug!(rows = backend.rows.len(), "Stored walk loaded");
        Ok(backend)
    }

    /// Builds a backend from walk file content.
    pub fn from_text(hostname: HostName, content: &str) -> Self {
        let rows = content.lines().filter_map(parse_walk_line).collect();
        Self { hostname, rows }
    }
}

/// Parses one `OID value` line.
fn parse_walk_line(line: &str) -> Option<(String, SnmpValue)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (oid, value) = match line.split_once(char::is_whitespace) {
        Some((oid, value)) => (oid, value.trim()),
        None => (line, ""),
    };
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    let oid = if oid.starts_with('.') {
        oid.to_string()
    } else {
        format!(".{oid}")
    };
    Some((oid, SnmpValue::text(value)))
}

#[async_trait]
impl SnmpBackend for StoredWalkBackend {
    fn hostname(&self) -> &HostName {
        &self.hostname
    }

    async fn get(&mut self, oid: &str, _context: &str) -> Result<Option<SnmpValue>, FetchFailure> {
        let value = self
            .rows
            .iter()
            .find(|(row_oid, _)| row_oid == oid)
            .map(|(_, value)| value.clone());
        trace!(oid = %oid, found = value.is_some(), "Stored walk get");
        Ok(value)
    }

    async fn walk(&mut self, oid: &str, _context: &str) -> Result<SnmpRowInfo, FetchFailure> {
        let rows: SnmpRowInfo = self
            .rows
            .iter()
            .filter(|(row_oid, _)| oid_in_subtree(row_oid, oid))
            .cloned()
            .collect();
        trace!(oid = %oid, rows = rows.len(), "Stored walk walk");
        Ok(rows)
    }
}

// ============================================================================
// Tests
// ============================================================================
