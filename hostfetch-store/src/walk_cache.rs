//! Per-host cache of SNMP walk results.
//!
//! Within one fetch the cache deduplicates walks of the same OID. Entries
//! whose key has `persist` set also survive on disk between fetches, one
//! file per walk:
//!
//! ```text
//! <base>/<relative_walk_cache_path>/<hostname>/OID<fetchoid>-<context_hash>
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hostfetch_core::SnmpRowInfo;
use ring::digest;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::persistence::{list_files, load_json_or_miss, remove_dir, save_json};

/// Prefix of every walk cache file name.
const FILE_PREFIX: &str = "OID";

/// Hex digits of the context digest kept in keys and file names.
const CONTEXT_HASH_LEN: usize = 16;

/// Short stable digest of an SNMPv3 context name.
///
/// The default context is the empty string.
pub fn context_hash(context: &str) -> String {
    let digest = digest::digest(&digest::SHA256, context.as_bytes());
    let mut hex = String::with_capacity(CONTEXT_HASH_LEN);
    for byte in digest.as_ref() {
        if hex.len() >= CONTEXT_HASH_LEN {
            break;
        }
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

// ============================================================================
// Key
// ============================================================================

/// Identifies one walk: OID, context, and whether it may be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalkCacheKey {
    /// The walked OID.
    pub fetchoid: String,
    /// See [`context_hash`].
    pub context_hash: String,
    /// Whether the entry is written to disk on save.
    pub persist: bool,
}

impl WalkCacheKey {
    /// Creates a key.
    pub fn new(fetchoid: impl Into<String>, context_hash: impl Into<String>, persist: bool) -> Self {
        Self {
            fetchoid: fetchoid.into(),
            context_hash: context_hash.into(),
            persist,
        }
    }

    /// File name of a persisted entry.
    pub fn file_name(&self) -> String {
        format!("{FILE_PREFIX}{}-{}", self.fetchoid, self.context_hash)
    }

    /// Parses a persisted file name back into a key (always `persist`).
    pub fn from_file_name(name: &str) -> Result<Self, StoreError> {
        name.strip_prefix(FILE_PREFIX)
            .and_then(|rest| rest.rsplit_once('-'))
            .filter(|(oid, hash)| !oid.is_empty() && !hash.is_empty())
            .map(|(oid, hash)| Self::new(oid, hash, true))
            .ok_or_else(|| StoreError::InvalidFileName(name.to_string()))
    }
}

// ============================================================================
// Walk Cache
// ============================================================================

/// Walk results of one host.
#[derive(Debug, Clone)]
pub struct WalkCache {
    path: PathBuf,
    entries: BTreeMap<WalkCacheKey, SnmpRowInfo>,
}

impl WalkCache {
    /// Creates an empty cache rooted at the host's walk cache directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// The host's walk cache directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached rows for a walk.
    pub fn get(&self, key: &WalkCacheKey) -> Option<&SnmpRowInfo> {
        self.entries.get(key)
    }

    /// Returns true if the walk is cached.
    pub fn contains(&self, key: &WalkCacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores the rows of a walk.
    pub fn insert(&mut self, key: WalkCacheKey, rows: SnmpRowInfo) {
        self.entries.insert(key, rows);
    }

    /// Number of cached walks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all cached walks.
    pub fn iter(&self) -> impl Iterator<Item = (&WalkCacheKey, &SnmpRowInfo)> {
        self.entries.iter()
    }

    /// Loads all persisted walks from disk.
    ///
    /// Unreadable files are logged and skipped.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&mut self) {
        let files = match list_files(&self.path).await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Cannot read walk cache directory");
                return;
            }
        };

        for (name, path) in files {
            let key = match WalkCacheKey::from_file_name(&name) {
                Ok(key) => key,
                Err(e) => {
                    debug!(error = %e, "Skipping foreign file");
                    continue;
                }
            };
            if let Some(rows) = load_json_or_miss::<SnmpRowInfo>(&path).await {
                self.entries.insert(key, rows);
            }
        }
        debug!(entries = self.entries.len(), "Walk cache loaded");
    }

    /// Writes every entry with `persist` set to disk.
    ///
    /// Failures are logged per file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self) {
        let mut saved = 0usize;
        for (key, rows) in self.entries.iter().filter(|(key, _)| key.persist) {
            let path = self.path.join(key.file_name());
            match save_json(&path, rows).await {
                Ok(()) => saved += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to persist walk"),
            }
        }
        debug!(saved, "Walk cache saved");
    }

    /// Forgets all entries and deletes the persisted files.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = remove_dir(&self.path).await {
            warn!(error = %e, "Failed to clear walk cache directory");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hostfetch_core::SnmpValue;

    fn rows(values: &[(&str, &str)]) -> SnmpRowInfo {
        values
            .iter()
            .map(|(oid, v)| ((*oid).to_string(), SnmpValue::text(*v)))
            .collect()
    }

    #[test]
    fn test_context_hash_is_stable_and_short() {
        let hash = context_hash("");
        assert_eq!(hash.len(), 16);
        // SHA-256 of the empty string.
        assert_eq!(hash, "e3b0c44298fc1c14");
        assert_ne!(context_hash("vlan-100"), hash);
    }

    #[test]
    fn test_file_name_roundtrip() {
        let key = WalkCacheKey::new(".1.3.6.1.2.1.2.2.1.2", "e3b0c44298fc1c14", true);
        assert_eq!(key.file_name(), "OID.1.3.6.1.2.1.2.2.1.2-e3b0c44298fc1c14");
        assert_eq!(WalkCacheKey::from_file_name(&key.file_name()).unwrap(), key);
        assert!(WalkCacheKey::from_file_name("notes.txt").is_err());
        assert!(WalkCacheKey::from_file_name("OID-abc").is_err());
    }

    #[tokio::test]
    async fn test_only_persisted_entries_survive() {
        let dir = tempfile::tempdir().unwrap();
        let hash = context_hash("");

        let mut cache = WalkCache::new(dir.path().join("router1"));
        let kept = WalkCacheKey::new(".1.3.6.1.2.1.1.5", hash.clone(), true);
        let dropped = WalkCacheKey::new(".1.3.6.1.2.1.2.2.1.10", hash, false);
        cache.insert(kept.clone(), rows(&[(".1.3.6.1.2.1.1.5.0", "router1")]));
        cache.insert(dropped.clone(), rows(&[(".1.3.6.1.2.1.2.2.1.10.1", "42")]));
        cache.save().await;

        let mut fresh = WalkCache::new(dir.path().join("router1"));
        fresh.load().await;

        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh.get(&kept), cache.get(&kept));
        assert!(!fresh.contains(&dropped));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let key = WalkCacheKey::new(".1.3.6.1.2.1.1.1", context_hash(""), true);
        tokio::fs::write(dir.path().join(key.file_name()), b"{not json")
            .await
            .unwrap();

        let mut cache = WalkCache::new(dir.path());
        cache.load().await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router1");

        let mut cache = WalkCache::new(&path);
        cache.insert(
            WalkCacheKey::new(".1.3.6.1.2.1.1.5", context_hash(""), true),
            rows(&[(".1.3.6.1.2.1.1.5.0", "router1")]),
        );
        cache.save().await;
        assert!(path.exists());

        cache.clear().await;
        assert!(cache.is_empty());
        assert!(!path.exists());

        let mut reloaded = WalkCache::new(&path);
        reloaded.load().await;
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = WalkCache::new(dir.path().join("never-created"));
        cache.load().await;
        assert!(cache.is_empty());
    }
}
