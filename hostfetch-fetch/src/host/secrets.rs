//! Short-lived secret material for fetchers.
//!
//! Some data sources (special agents, SNMPv3 helpers) read passwords from
//! a file that must only exist while the fetch runs. A
//! [`SecretsProvider`] writes that file and hands back a [`SecretFile`]
//! guard; dropping the guard deletes the file, on every exit path.
//!
//! Values either come inline ([`AdHocSecrets`]) or are resolved from the
//! system keychain first ([`KeychainSecrets`]):
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::error::SecretsError;

/// Service name prefix for hostfetch credentials.
const SERVICE_PREFIX: &str = "hostfetch";

// ============================================================================
// Secret File Guard
// ============================================================================

/// A provisioned secrets file. Deleted when dropped.
#[derive(Debug)]
pub struct SecretFile {
    path: Option<PathBuf>,
}

impl SecretFile {
    /// A guard that owns no file.
    pub fn none() -> Self {
        Self { path: None }
    }

    /// Takes ownership of an existing file.
    pub fn owned(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Path of the provisioned file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for SecretFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => trace!(path = %path.display(), "Removed secrets file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove secrets file"),
        }
    }
}

// ============================================================================
// Secrets Provider Trait
// ============================================================================

/// Provisions secret material for the duration of one fetch.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    /// Writes the secrets file and returns its guard.
    async fn provide_file(&self) -> Result<SecretFile, SecretsError>;
}

/// Provider for data sources that need no secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecrets;

#[async_trait]
impl SecretsProvider for NoSecrets {
    async fn provide_file(&self) -> Result<SecretFile, SecretsError> {
        Ok(SecretFile::none())
    }
}

/// Writes `secrets` as a JSON object to `path`, readable by the owner only.
async fn write_secrets_file(
    path: &Path,
    secrets: &BTreeMap<String, String>,
) -> Result<SecretFile, SecretsError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec(secrets)?;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    // The guard exists before the first byte is written so a failed write
    // still removes the file.
    let guard = SecretFile::owned(path.to_path_buf());
    let mut file = options.open(path).await?;
    file.write_all(&json).await?;
    file.flush().await?;

    debug!(path = %path.display(), count = secrets.len(), "Provisioned secrets file");
    Ok(guard)
}

// ============================================================================
// Ad-hoc Secrets
// ============================================================================

/// Secrets passed inline with the fetch job.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdHocSecrets {
    /// Where the secrets file is written.
    pub path: PathBuf,
    /// Secret identifier to value.
    pub secrets: BTreeMap<String, String>,
}

impl AdHocSecrets {
    /// Creates an ad-hoc provider.
    pub fn new(path: impl Into<PathBuf>, secrets: BTreeMap<String, String>) -> Self {
        Self {
            path: path.into(),
            secrets,
        }
    }
}

impl std::fmt::Debug for AdHocSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdHocSecrets")
            .field("path", &self.path)
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl SecretsProvider for AdHocSecrets {
    async fn provide_file(&self) -> Result<SecretFile, SecretsError> {
        write_secrets_file(&self.path, &self.secrets).await
    }
}

// ============================================================================
// Keychain Lookup
// ============================================================================

/// Read access to secure credential storage.
#[async_trait]
pub trait KeychainLookup: Send + Sync {
    /// Returns the stored secret, or `None` if there is no entry.
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretsError>;
}

/// Lookup backed by the system keychain via the `keyring` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemKeychain;

impl SystemKeychain {
    /// Creates a new system keychain instance.
    pub fn new() -> Self {
        Self
    }

    /// Builds the full service name with prefix.
    fn full_service(service: &str) -> String {
        format!("{SERVICE_PREFIX}:{service}")
    }
}

#[async_trait]
impl KeychainLookup for SystemKeychain {
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretsError> {
        let entry = Entry::new(&Self::full_service(service), account)?;
        match entry.get_password() {
            Ok(secret) => {
                trace!(service = %service, account = %account, "Credential found");
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to get credential");
                Err(e.into())
            }
        }
    }
}

// ============================================================================
// Keychain Secrets
// ============================================================================

/// Location of one secret in the keychain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    /// Service identifier (without the `hostfetch:` prefix).
    pub service: String,
    /// Account identifier.
    pub account: String,
}

/// Secrets resolved from the keychain right before the fetch.
pub struct KeychainSecrets {
    path: PathBuf,
    entries: BTreeMap<String, SecretRef>,
    keychain: Arc<dyn KeychainLookup>,
}

impl KeychainSecrets {
    /// Creates a provider using the system keychain.
    pub fn new(path: impl Into<PathBuf>, entries: BTreeMap<String, SecretRef>) -> Self {
        Self::with_keychain(path, entries, Arc::new(SystemKeychain::new()))
    }

    /// Creates a provider using a custom keychain.
    pub fn with_keychain(
        path: impl Into<PathBuf>,
        entries: BTreeMap<String, SecretRef>,
        keychain: Arc<dyn KeychainLookup>,
    ) -> Self {
        Self {
            path: path.into(),
            entries,
            keychain,
        }
    }
}

impl std::fmt::Debug for KeychainSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainSecrets")
            .field("path", &self.path)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretsProvider for KeychainSecrets {
    async fn provide_file(&self) -> Result<SecretFile, SecretsError> {
        let mut resolved = BTreeMap::new();
        for (id, secret) in &self.entries {
            let value = self
                .keychain
                .get(&secret.service, &secret.account)
                .await?
                .ok_or_else(|| SecretsError::NotFound {
                    service: secret.service.clone(),
                    account: secret.account.clone(),
                })?;
            resolved.insert(id.clone(), value);
        }
        write_secrets_file(&self.path, &resolved).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct MapKeychain(BTreeMap<(String, String), String>);

    #[async_trait]
    impl KeychainLookup for MapKeychain {
        async fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretsError> {
            Ok(self.0.get(&(service.to_string(), account.to_string())).cloned())
        }
    }

    #[test]
    fn test_full_service_name() {
        assert_eq!(SystemKeychain::full_service("snmp"), "hostfetch:snmp");
    }

    #[tokio::test]
    async fn test_no_secrets_owns_nothing() {
        let guard = NoSecrets.provide_file().await.unwrap();
        assert!(guard.path().is_none());
    }

    #[tokio::test]
    async fn test_adhoc_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets").join("host1");
        let provider = AdHocSecrets::new(
            &path,
            BTreeMap::from([("pw".to_string(), "hunter2".to_string())]),
        );

        let guard = provider.provide_file().await.unwrap();
        let content: BTreeMap<String, String> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(content.get("pw").map(String::as_str), Some("hunter2"));

        drop(guard);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_adhoc_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets");
        let guard = AdHocSecrets::new(&path, BTreeMap::new())
            .provide_file()
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Secrets file should have 0600 permissions");
        drop(guard);
    }

    #[test]
    fn test_adhoc_debug_hides_values() {
        let provider = AdHocSecrets::new(
            "/tmp/x",
            BTreeMap::from([("pw".to_string(), "hunter2".to_string())]),
        );
        assert!(!format!("{provider:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn test_keychain_secrets_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets");
        let keychain = MapKeychain(BTreeMap::from([(
            ("snmp".to_string(), "router".to_string()),
            "s3cret".to_string(),
        )]));
        let provider = KeychainSecrets::with_keychain(
            &path,
            BTreeMap::from([(
                "community".to_string(),
                SecretRef {
                    service: "snmp".to_string(),
                    account: "router".to_string(),
                },
            )]),
            Arc::new(keychain),
        );

        let _guard = provider.provide_file().await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("s3cret"));
    }

    #[tokio::test]
    async fn test_keychain_secret_missing() {
        let dir = tempfile::tempdir().unwrap();
        let provider = KeychainSecrets::with_keychain(
            dir.path().join("secrets"),
            BTreeMap::from([(
                "pw".to_string(),
                SecretRef {
                    service: "x".to_string(),
                    account: "y".to_string(),
                },
            )]),
            Arc::new(MapKeychain(BTreeMap::new())),
        );

        let result = provider.provide_file().await;
        assert!(matches!(result, Err(SecretsError::NotFound { .. })));
        assert!(!dir.path().join("secrets").exists());
    }
}
