//! Tests for the trigger family.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hostfetch_core::{HostName, Mode};

use crate::error::{Cancelled, FetchFailure, FetcherError, SecretsError, TriggerError};
use crate::fetcher::{Fetcher, FetcherType};
use crate::file_cache::FileCache;
use crate::host::secrets::{AdHocSecrets, SecretFile, SecretsProvider};
use crate::trigger::{
    AnyTrigger, FetcherTrigger, PlainFetcherTrigger, TimeoutFetcherTrigger, TriggerParams,
};

// ============================================================================
// Test Doubles
// ============================================================================

#[derive(Clone, Copy, Default)]
enum Behavior {
    #[default]
    Succeed,
    Fail,
    Cancel,
    Hang,
}

#[derive(Default)]
struct RecordingFetcher {
    behavior: Behavior,
    opened: u32,
    closed: u32,
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    type RawData = Vec<u8>;

    fn fetcher_type(&self) -> FetcherType {
        FetcherType::Program
    }

    async fn open(&mut self) -> Result<(), FetchFailure> {
        self.opened += 1;
        Ok(())
    }

    async fn close(&mut self) {
        self.closed += 1;
    }

    async fn fetch_from_io(&mut self, _mode: Mode) -> Result<Vec<u8>, FetchFailure> {
        match self.behavior {
            Behavior::Succeed => Ok(b"fresh".to_vec()),
            Behavior::Fail => Err(FetcherError::Program("exit 2".to_string()).into()),
            Behavior::Cancel => Err(Cancelled::new("shutdown").into()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

struct MemoryCache {
    hostname: HostName,
    content: Option<Vec<u8>>,
    simulation: bool,
    use_only_cache: bool,
    written: Mutex<Vec<Vec<u8>>>,
}

impl MemoryCache {
    fn new(content: Option<&[u8]>) -> Self {
        Self {
            hostname: HostName::new("router1").unwrap(),
            content: content.map(<[u8]>::to_vec),
            simulation: false,
            use_only_cache: false,
            written: Mutex::new(Vec::new()),
        }
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileCache<Vec<u8>> for MemoryCache {
    fn hostname(&self) -> &HostName {
        &self.hostname
    }

    fn simulation(&self) -> bool {
        self.simulation
    }

    fn use_only_cache(&self) -> bool {
        self.use_only_cache
    }

    async fn read(&self, _mode: Mode) -> Option<Vec<u8>> {
        self.content.clone()
    }

    async fn write(&self, raw: &Vec<u8>, _mode: Mode) {
        self.written.lock().unwrap().push(raw.clone());
    }
}

#[derive(Default)]
struct CountingSecrets {
    provided: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl SecretsProvider for CountingSecrets {
    async fn provide_file(&self) -> Result<SecretFile, SecretsError> {
        self.provided.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(SecretsError::Keychain("locked".to_string()))
        } else {
            Ok(SecretFile::none())
        }
    }
}

// ============================================================================
// get_raw_data
// ============================================================================

#[tokio::test]
async fn test_cache_hit_skips_io_and_secrets() {
    let cache = MemoryCache::new(Some(b"cached"));
    let secrets = CountingSecrets::default();
    let mut fetcher = RecordingFetcher::default();

    let result = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &secrets)
        .await
        .unwrap();

    assert_eq!(result.unwrap(), b"cached");
    assert_eq!(fetcher.opened, 0);
    assert_eq!(secrets.provided.load(Ordering::SeqCst), 0);
    assert!(cache.writes().is_empty());
}

#[tokio::test]
async fn test_cache_miss_fetches_and_writes_back() {
    let cache = MemoryCache::new(None);
    let secrets = CountingSecrets::default();
    let mut fetcher = RecordingFetcher::default();

    let result = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &secrets)
        .await
        .unwrap();

    assert_eq!(result.unwrap(), b"fresh");
    assert_eq!((fetcher.opened, fetcher.closed), (1, 1));
    assert_eq!(secrets.provided.load(Ordering::SeqCst), 1);
    assert_eq!(cache.writes(), vec![b"fresh".to_vec()]);
}

#[tokio::test]
async fn test_simulation_miss_never_opens() {
    let mut cache = MemoryCache::new(None);
    cache.simulation = true;
    let secrets = CountingSecrets::default();
    let mut fetcher = RecordingFetcher::default();

    let result = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &secrets)
        .await
        .unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, FetcherError::NoData(_)));
    assert_eq!(
        err.to_string(),
        "Got no data (Simulation mode enabled and no cached data present)"
    );
    assert_eq!(fetcher.opened, 0);
    assert_eq!(secrets.provided.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_use_only_cache_miss() {
    let mut cache = MemoryCache::new(None);
    cache.use_only_cache = true;
    let mut fetcher = RecordingFetcher::default();

    let result = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Discovery, &CountingSecrets::default())
        .await
        .unwrap();

    assert_eq!(
        result.unwrap_err().to_string(),
        "Got no data (use only cache and no usable cache file present)"
    );
    assert_eq!(fetcher.opened, 0);
}

#[tokio::test]
async fn test_fault_is_value_and_not_cached() {
    let cache = MemoryCache::new(None);
    let mut fetcher = RecordingFetcher {
        behavior: Behavior::Fail,
        ..Default::default()
    };

    let result = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &CountingSecrets::default())
        .await
        .unwrap();

    assert_eq!(result.unwrap_err().to_string(), "exit 2");
    assert!(cache.writes().is_empty());
    assert_eq!(fetcher.closed, 1);
}

#[tokio::test]
async fn test_cancellation_passes_through() {
    let cache = MemoryCache::new(None);
    let mut fetcher = RecordingFetcher {
        behavior: Behavior::Cancel,
        ..Default::default()
    };

    let err = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &CountingSecrets::default())
        .await
        .unwrap_err();

    assert_eq!(err, Cancelled::new("shutdown"));
    assert!(cache.writes().is_empty());
    assert_eq!(fetcher.closed, 1);
}

#[tokio::test]
async fn test_secrets_failure_skips_fetcher() {
    let cache = MemoryCache::new(None);
    let secrets = CountingSecrets {
        fail: true,
        ..Default::default()
    };
    let mut fetcher = RecordingFetcher::default();

    let result = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &secrets)
        .await
        .unwrap();

    assert!(matches!(result, Err(FetcherError::Secrets(_))));
    assert_eq!(fetcher.opened, 0);
}

#[tokio::test]
async fn test_secrets_file_removed_after_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("router1.secrets");
    let secrets = AdHocSecrets::new(
        &path,
        BTreeMap::from([("community".to_string(), "public".to_string())]),
    );
    let cache = MemoryCache::new(None);
    let mut fetcher = RecordingFetcher::default();

    let result = PlainFetcherTrigger
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &secrets)
        .await
        .unwrap();

    assert!(result.is_ok());
    assert!(!path.exists());
}

// ============================================================================
// Timeout Trigger
// ============================================================================

#[tokio::test]
async fn test_timeout_trigger_cancels_and_closes() {
    let cache = MemoryCache::new(None);
    let mut fetcher = RecordingFetcher {
        behavior: Behavior::Hang,
        ..Default::default()
    };

    let err = TimeoutFetcherTrigger::new(1)
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &CountingSecrets::default())
        .await
        .unwrap_err();

    assert_eq!(err, Cancelled::timeout(Duration::from_secs(1)));
    assert_eq!(fetcher.closed, 1);
    assert!(cache.writes().is_empty());
}

#[tokio::test]
async fn test_timeout_trigger_within_deadline() {
    let cache = MemoryCache::new(None);
    let mut fetcher = RecordingFetcher::default();

    let result = TimeoutFetcherTrigger::new(10)
        .get_raw_data(&cache, &mut fetcher, Mode::Checking, &CountingSecrets::default())
        .await
        .unwrap();

    assert_eq!(result.unwrap(), b"fresh");
}

// ============================================================================
// Identity and Serialization
// ============================================================================

#[test]
fn test_params_roundtrip() {
    let trigger = TimeoutFetcherTrigger::new(60);
    let params = trigger.serialized_params();
    assert_eq!(params.get("timeout").and_then(|v| v.as_u64()), Some(60));

    let rebuilt = AnyTrigger::from_ident(trigger.ident(), &params).unwrap();
    assert_eq!(rebuilt, AnyTrigger::Timeout(trigger));
    assert!(PlainFetcherTrigger.serialized_params().is_empty());
}

#[test]
fn test_same_as() {
    let a = TimeoutFetcherTrigger::new(30);
    let b = AnyTrigger::Timeout(TimeoutFetcherTrigger::new(30));
    let c = TimeoutFetcherTrigger::new(31);

    assert!(a.same_as(&b));
    assert!(!a.same_as(&c));
    assert!(!PlainFetcherTrigger.same_as(&a));
    assert!(PlainFetcherTrigger.same_as(&AnyTrigger::default()));
}

#[test]
fn test_from_params_errors() {
    let err = AnyTrigger::from_ident("relay", &TriggerParams::new()).unwrap_err();
    assert!(matches!(err, TriggerError::UnknownTrigger(_)));

    let mut params = TriggerParams::new();
    params.insert("timeout".to_string(), serde_json::Value::from("soon"));
    assert!(matches!(
        TimeoutFetcherTrigger::from_params(&params),
        Err(TriggerError::InvalidParams(_))
    ));
}

#[test]
fn test_any_trigger_infers_variant() {
    let mut params = TriggerParams::new();
    params.insert("timeout".to_string(), serde_json::Value::from(5));
    assert_eq!(
        AnyTrigger::from_params(&params).unwrap(),
        AnyTrigger::Timeout(TimeoutFetcherTrigger::new(5))
    );
    assert_eq!(
        AnyTrigger::from_params(&TriggerParams::new()).unwrap(),
        AnyTrigger::Plain(PlainFetcherTrigger)
    );
}
