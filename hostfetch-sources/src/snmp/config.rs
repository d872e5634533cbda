//! SNMP fetcher configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use hostfetch_core::{HostName, SectionName};
use serde::{Deserialize, Serialize};

/// Default directory of stored walks, relative to the base path.
pub const DEFAULT_STORED_WALK_PATH: &str = "snmpwalks";
/// Default directory of persisted walks, relative to the base path.
pub const DEFAULT_WALK_CACHE_PATH: &str = "snmp_walk_cache";
/// Default directory of interval-cached sections, relative to the base path.
pub const DEFAULT_SECTION_CACHE_PATH: &str = "snmp_section_cache";

/// Default SNMP port.
pub const DEFAULT_PORT: u16 = 161;

// ============================================================================
// Enums
// ============================================================================

/// What to do when evaluating a section's detection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Abort the fetch.
    #[default]
    Raise,
    /// Log and skip the section.
    Warn,
    /// Skip the section silently.
    Ignore,
}

/// Which SNMP implementation talks to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnmpBackendKind {
    /// In-process protocol implementation.
    #[default]
    Inline,
    /// External command-line tools.
    Classic,
    /// A walk previously stored on disk.
    StoredWalk,
}

impl std::fmt::Display for SnmpBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Inline => "inline",
            Self::Classic => "classic",
            Self::StoredWalk => "stored_walk",
        })
    }
}

/// Sections a caller restricts the fetch to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionSelection {
    /// No restriction.
    #[default]
    All,
    /// Only the named sections.
    Only(BTreeSet<SectionName>),
}

impl SectionSelection {
    /// Whether `section` passes the restriction.
    pub fn includes(&self, section: &SectionName) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(section),
        }
    }
}

// ============================================================================
// Host and Scan Configuration
// ============================================================================

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> u64 {
    1
}

fn default_retries() -> u32 {
    5
}

fn default_contexts() -> Vec<String> {
    vec![String::new()]
}

/// How to reach one SNMP device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpHostConfig {
    /// Host name, also the cache directory name.
    pub hostname: HostName,
    /// Address to query.
    #[serde(default)]
    pub ipaddress: Option<String>,
    /// UDP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Retries per request.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// SNMPv3 contexts to walk. The empty string is the default context.
    #[serde(default = "default_contexts")]
    pub contexts: Vec<String>,
    /// Backend used unless overridden.
    #[serde(default)]
    pub backend: SnmpBackendKind,
}

impl SnmpHostConfig {
    /// Creates a configuration with defaults for everything but the name.
    pub fn new(hostname: HostName) -> Self {
        Self {
            hostname,
            ipaddress: None,
            port: DEFAULT_PORT,
            timeout: default_timeout(),
            retries: default_retries(),
            contexts: default_contexts(),
            backend: SnmpBackendKind::default(),
        }
    }
}

/// Settings for detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpScanConfig {
    /// Failure handling per section.
    pub on_error: OnError,
    /// The device is known not to answer sysDescr.
    pub missing_sys_description: bool,
}

// ============================================================================
// Fetcher Configuration
// ============================================================================

/// Per host, per section fetch interval in seconds.
pub type FetchIntervals = BTreeMap<HostName, BTreeMap<SectionName, u64>>;

fn default_stored_walk_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORED_WALK_PATH)
}

fn default_walk_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_WALK_CACHE_PATH)
}

fn default_section_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_SECTION_CACHE_PATH)
}

/// Everything an [`SnmpFetcher`](super::SnmpFetcher) needs besides the
/// host and its sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpFetcherConfig {
    /// Failure handling during detection.
    #[serde(default)]
    pub on_error: OnError,
    /// The device is known not to answer sysDescr.
    #[serde(default)]
    pub missing_sys_description: bool,
    /// Restriction applied to section metadata by callers.
    #[serde(default)]
    pub selected_sections: SectionSelection,
    /// Backend to use instead of the host's.
    #[serde(default)]
    pub backend_override: Option<SnmpBackendKind>,
    /// Inventory sections are also detected in checking mode.
    #[serde(default)]
    pub do_status_data_inventory: bool,
    /// Section fetch intervals per host.
    #[serde(default)]
    pub fetch_intervals: FetchIntervals,
    /// Root of all cache directories.
    pub base_path: PathBuf,
    /// Stored walks, below `base_path`.
    #[serde(default = "default_stored_walk_path")]
    pub relative_stored_walk_path: PathBuf,
    /// Persisted walks, below `base_path`.
    #[serde(default = "default_walk_cache_path")]
    pub relative_walk_cache_path: PathBuf,
    /// Interval-cached sections, below `base_path`.
    #[serde(default = "default_section_cache_path")]
    pub relative_section_cache_path: PathBuf,
}

impl SnmpFetcherConfig {
    /// Creates a configuration with default relative paths.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            on_error: OnError::default(),
            missing_sys_description: false,
            selected_sections: SectionSelection::default(),
            backend_override: None,
            do_status_data_inventory: false,
            fetch_intervals: FetchIntervals::new(),
            base_path: base_path.into(),
            relative_stored_walk_path: default_stored_walk_path(),
            relative_walk_cache_path: default_walk_cache_path(),
            relative_section_cache_path: default_section_cache_path(),
        }
    }

    /// The detection settings.
    pub fn scan_config(&self) -> SnmpScanConfig {
        SnmpScanConfig {
            on_error: self.on_error,
            missing_sys_description: self.missing_sys_description,
        }
    }

    /// File holding the stored walk of a host.
    pub fn stored_walk_path(&self, host: &HostName) -> PathBuf {
        self.host_dir(&self.relative_stored_walk_path, host)
    }

    /// Directory of a host's persisted walks.
    pub fn walk_cache_path(&self, host: &HostName) -> PathBuf {
        self.host_dir(&self.relative_walk_cache_path, host)
    }

    /// Directory of a host's interval-cached sections.
    pub fn section_cache_path(&self, host: &HostName) -> PathBuf {
        self.host_dir(&self.relative_section_cache_path, host)
    }

    /// Fetch intervals configured for a host.
    pub fn intervals_for(&self, host: &HostName) -> BTreeMap<SectionName, u64> {
        self.fetch_intervals.get(host).cloned().unwrap_or_default()
    }

    fn host_dir(&self, relative: &Path, host: &HostName) -> PathBuf {
        self.base_path.join(relative).join(host.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostName {
        HostName::new("router1").unwrap()
    }

    #[test]
    fn test_paths_per_host() {
        let config = SnmpFetcherConfig::new("/var/lib/hostfetch");
        assert_eq!(
            config.walk_cache_path(&host()),
            Path::new("/var/lib/hostfetch/snmp_walk_cache/router1")
        );
        assert_eq!(
            config.section_cache_path(&host()),
            Path::new("/var/lib/hostfetch/snmp_section_cache/router1")
        );
        assert_eq!(
            config.stored_walk_path(&host()),
            Path::new("/var/lib/hostfetch/snmpwalks/router1")
        );
    }

    #[test]
    fn test_config_from_json_with_defaults() {
        let config: SnmpFetcherConfig = serde_json::from_str(
            r#"{
                "base_path": "/tmp/hf",
                "on_error": "warn",
                "backend_override": "stored_walk",
                "fetch_intervals": {"router1": {"if64": 300}}
            }"#,
        )
        .unwrap();

        assert_eq!(config.on_error, OnError::Warn);
        assert_eq!(config.backend_override, Some(SnmpBackendKind::StoredWalk));
        assert_eq!(config.selected_sections, SectionSelection::All);
        assert_eq!(
            config.intervals_for(&host()),
            BTreeMap::from([(SectionName::new("if64").unwrap(), 300)])
        );
        assert!(config.intervals_for(&HostName::new("other").unwrap()).is_empty());
    }

    #[test]
    fn test_host_config_defaults() {
        let config: SnmpHostConfig = serde_json::from_str(r#"{"hostname": "router1"}"#).unwrap();
        assert_eq!(config, SnmpHostConfig::new(host()));
        assert_eq!(config.contexts, vec![String::new()]);
    }

    #[test]
    fn test_section_selection() {
        let cpu = SectionName::new("cpu").unwrap();
        let only = SectionSelection::Only(BTreeSet::from([cpu.clone()]));
        assert!(only.includes(&cpu));
        assert!(!only.includes(&SectionName::new("mem").unwrap()));
        assert!(SectionSelection::All.includes(&cpu));
    }
}
