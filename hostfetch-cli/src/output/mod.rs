//! Output formatting for CLI.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;
#[cfg(test)]
mod tests;

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use hostfetch_core::{AgentRawData, HostName, Mode, SnmpRawData};
use hostfetch_fetch::FetcherType;
use hostfetch_store::{SectionCacheEntry, WalkCacheKey};

// ============================================================================
// Fetch Report
// ============================================================================

/// A payload of any fetcher.
#[derive(Debug)]
pub enum Payload {
    /// Agent, program or piggyback output.
    Agent(AgentRawData),
    /// SNMP sections.
    Snmp(SnmpRawData),
}

/// How a fetch ended.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Data was fetched or read from the cache.
    Payload(Payload),
    /// The fetcher reported a fault.
    Fault {
        /// Fault category.
        kind: &'static str,
        /// Fault message.
        message: String,
    },
    /// The fetch was cancelled.
    Cancelled(String),
}

/// Everything printed after a fetch.
#[derive(Debug)]
pub struct FetchReport {
    pub hostname: HostName,
    pub fetcher: FetcherType,
    pub mode: Mode,
    pub trigger: &'static str,
    pub outcome: FetchOutcome,
}

// ============================================================================
// Cache Report
// ============================================================================

/// One interval-cached section with its validity at report time.
#[derive(Debug)]
pub struct SectionReport {
    pub entry: SectionCacheEntry,
    /// Configured validity in seconds, if the section has an interval.
    pub validity: Option<u64>,
    /// End of validity, if known.
    pub valid_until: Option<DateTime<Utc>>,
    /// Whether the entry would still be used, if known.
    pub valid: Option<bool>,
}

impl SectionReport {
    /// Evaluates `entry` against `validity` at `now`.
    pub fn new(entry: SectionCacheEntry, validity: Option<u64>, now: DateTime<Utc>) -> Self {
        let valid_until = validity.and_then(|seconds| {
            let seconds = Duration::try_seconds(i64::try_from(seconds).ok()?)?;
            entry.captured_at.checked_add_signed(seconds)
        });
        // An interval too large to represent never expires.
        let valid = validity.map(|_| valid_until.is_none_or(|until| until > now));
        Self {
            entry,
            validity,
            valid_until,
            valid,
        }
    }
}

/// Contents of a host's SNMP caches.
#[derive(Debug)]
pub struct CacheReport {
    pub hostname: HostName,
    pub walk_cache_dir: PathBuf,
    pub walks: Vec<WalkCacheKey>,
    pub section_cache_dir: PathBuf,
    pub sections: Vec<SectionReport>,
}
