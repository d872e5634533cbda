//! Fetch job files.
//!
//! A job names the host, the fetcher with its construction parameters,
//! and optionally a file cache and secrets:
//!
//! ```json
//! {
//!   "hostname": "switch-07",
//!   "fetcher": {"type": "tcp", "address": "10.0.0.7"},
//!   "file_cache": {"directory": "/var/cache/hostfetch/raw", "max_age": {"checking": 60}},
//!   "secrets": {"path": "/run/hostfetch/switch-07.json", "values": {"community": "public"}}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use hostfetch_core::{HostName, SnmpPluginStore};
use hostfetch_fetch::{AdHocSecrets, KeychainSecrets, NoSecrets, SecretRef, SecretsProvider};
use hostfetch_sources::{PiggybackFetcher, ProgramFetcher, SnmpFetcher, TcpFetcher};
use hostfetch_store::FileCacheConfig;
use serde::Deserialize;
use tracing::warn;

/// One fetch job.
#[derive(Debug, Deserialize)]
pub struct FetchJob {
    /// Host the payload belongs to.
    pub hostname: HostName,
    /// The data source.
    pub fetcher: JobFetcher,
    /// Byte-level cache of the last payload. No caching if absent.
    #[serde(default)]
    pub file_cache: Option<FileCacheConfig>,
    /// Secrets handed to the fetcher through a file.
    #[serde(default)]
    pub secrets: Option<JobSecrets>,
}

impl FetchJob {
    /// Reads a job from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read job file {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid job file {}", path.display()))
    }

    /// Parses a job.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// The fetcher of a job, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobFetcher {
    /// SNMP device.
    Snmp(SnmpJob),
    /// Data-source program.
    Program(ProgramFetcher),
    /// TCP agent.
    Tcp(TcpFetcher),
    /// Piggybacked host.
    Piggyback(PiggybackFetcher),
}

/// SNMP fetcher parameters plus the section descriptions it needs.
#[derive(Debug, Deserialize)]
pub struct SnmpJob {
    /// Construction parameters.
    pub fetcher: SnmpFetcher,
    /// Known sections.
    #[serde(default)]
    pub plugin_store: SnmpPluginStore,
}

impl SnmpJob {
    /// The fetcher with its section descriptions attached.
    pub fn into_fetcher(self) -> SnmpFetcher {
        self.fetcher.with_plugin_store(Arc::new(self.plugin_store))
    }
}

/// Where secrets come from.
#[derive(Debug, Deserialize)]
pub struct JobSecrets {
    /// File the secrets are written to during the fetch.
    pub path: PathBuf,
    /// Literal values.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    /// Values looked up in the system keychain.
    #[serde(default)]
    pub keychain: BTreeMap<String, SecretRef>,
}

impl JobSecrets {
    /// Builds the provider. Keychain entries win over literal values.
    pub fn provider(&self) -> Box<dyn SecretsProvider> {
        if self.keychain.is_empty() {
            return Box::new(AdHocSecrets::new(&self.path, self.values.clone()));
        }
        if !self.values.is_empty() {
            warn!("Both literal and keychain secrets given, using the keychain");
        }
        Box::new(KeychainSecrets::new(&self.path, self.keychain.clone()))
    }
}

/// Provider for an optional secrets section.
pub fn secrets_provider(secrets: Option<&JobSecrets>) -> Box<dyn SecretsProvider> {
    match secrets {
        Some(secrets) => secrets.provider(),
        None => Box::new(NoSecrets),
    }
}
