//! Section-interval cache.
//!
//! Sections configured with a fetch interval are not fetched on every
//! check cycle. The last payload is kept on disk together with the time it
//! was captured and reused while `captured_at + validity > now`.
//!
//! File layout: `<base>/<relative_section_cache_path>/<hostname>/<section>`
//! containing `[captured_at, payload]` as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use hostfetch_core::{SectionMarker, SectionName, SnmpRawSection};
use tracing::{debug, instrument, trace, warn};

use crate::error::StoreError;
use crate::persistence::{list_files, load_json_or_miss, save_json};

/// Payload of one section together with its capture time (epoch seconds).
pub type CachedSection = (i64, SnmpRawSection);

/// Section payloads of one host, limited to configured fetch intervals.
#[derive(Debug, Clone)]
pub struct ConfiguredFetchIntervallCache {
    path: PathBuf,
    intervals: BTreeMap<SectionName, u64>,
    now: i64,
    entries: BTreeMap<SectionName, CachedSection>,
    fresh: BTreeSet<SectionName>,
}

impl ConfiguredFetchIntervallCache {
    /// Creates an empty cache.
    ///
    /// `intervals` maps section names to their validity in seconds; `now`
    /// is the epoch second used both for validity checks and as the
    /// capture time of new entries.
    pub fn new(path: impl Into<PathBuf>, intervals: BTreeMap<SectionName, u64>, now: i64) -> Self {
        Self {
            path: path.into(),
            intervals,
            now,
            entries: BTreeMap::new(),
            fresh: BTreeSet::new(),
        }
    }

    /// The host's section cache directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured validity of a section, if any.
    pub fn validity(&self, section: &SectionName) -> Option<u64> {
        self.intervals.get(section).copied()
    }

    /// Whether a still-valid payload for `section` is available.
    pub fn contains(&self, section: &SectionName) -> bool {
        self.entries.contains_key(section)
    }

    /// The cached payload of a section.
    pub fn get(&self, section: &SectionName) -> Option<&CachedSection> {
        self.entries.get(section)
    }

    /// Entries read from disk (not added during this fetch).
    pub fn cached_entries(&self) -> impl Iterator<Item = (&SectionName, &CachedSection)> {
        self.entries
            .iter()
            .filter(|(name, _)| !self.fresh.contains(*name))
    }

    /// Marker for a section captured at `captured_at`.
    ///
    /// Sections without a configured interval get a plain marker.
    pub fn marker(&self, section: &SectionName, captured_at: i64) -> SectionMarker {
        SectionMarker::new(section.clone(), captured_at, self.validity(section))
    }

    /// Marker for a section fetched during this call.
    pub fn fresh_marker(&self, section: &SectionName) -> SectionMarker {
        self.marker(section, self.now)
    }

    fn is_valid(&self, captured_at: i64, validity: u64) -> bool {
        let validity = i64::try_from(validity).unwrap_or(i64::MAX);
        captured_at.saturating_add(validity) > self.now
    }

    /// Reads the payloads of all configured sections that are still valid.
    #[instrument(skip(self), fields(path = %self.path.display(), now = self.now))]
    pub async fn load(&mut self) {
        for (section, validity) in &self.intervals {
            let path = self.path.join(section.as_str());
            let Some((captured_at, payload)) = load_json_or_miss::<CachedSection>(&path).await
            else {
                continue;
            };

            if self.is_valid(captured_at, *validity) {
                trace!(section = %section, captured_at, "Using cached section");
                self.entries.insert(section.clone(), (captured_at, payload));
            } else {
                debug!(section = %section, captured_at, validity, "Cached section expired");
            }
        }
    }

    /// Records a freshly fetched section.
    ///
    /// Ignored for sections without a configured interval.
    pub fn insert(&mut self, section: SectionName, payload: SnmpRawSection) {
        if self.intervals.contains_key(&section) {
            self.entries.insert(section.clone(), (self.now, payload));
            self.fresh.insert(section);
        }
    }

    /// Writes the sections recorded during this fetch.
    ///
    /// Failures are logged per file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self) {
        for section in &self.fresh {
            let Some(entry) = self.entries.get(section) else {
                continue;
            };
            let path = self.path.join(section.as_str());
            if let Err(e) = save_json(&path, entry).await {
                warn!(section = %section, error = %e, "Failed to persist section");
            }
        }
    }
}

// ============================================================================
// Inspection
// ============================================================================

/// One persisted section, as listed by [`list_section_cache`].
#[derive(Debug, Clone, PartialEq)]
pub struct SectionCacheEntry {
    /// Section name (the file name).
    pub section: String,
    /// When the payload was captured.
    pub captured_at: DateTime<Utc>,
    /// Number of tables in the payload.
    pub tables: usize,
}

/// Lists the persisted sections of one host directory.
///
/// Unreadable files are skipped.
pub async fn list_section_cache(dir: &Path) -> Result<Vec<SectionCacheEntry>, StoreError> {
    let mut entries = Vec::new();
    for (name, path) in list_files(dir).await? {
        let Some((captured_at, payload)) = load_json_or_miss::<CachedSection>(&path).await else {
            continue;
        };
        let Some(captured_at) = Utc.timestamp_opt(captured_at, 0).single() else {
            continue;
        };
        entries.push(SectionCacheEntry {
            section: name,
            captured_at,
            tables: payload.len(),
        });
    }
    Ok(entries)
}

// ============================================================================
// Tests
// ============================================================================
