// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # hostfetch Store
//!
//! On-disk caches for the fetch layer.
//!
//! This crate provides:
//!
//! - **WalkCache**: SNMP walk results per host, optionally persisted
//! - **ConfiguredFetchIntervallCache**: section payloads reused while
//!   their fetch interval has not elapsed
//! - **DiskFileCache / NoCache**: whole-payload caches consulted by triggers
//! - **Persistence**: atomic file I/O helpers
//!
//! Nothing in here fails a fetch: unreadable files are misses, failed
//! writes are logged.
//!
//! ## Usage
//!
//! ```ignore
//! use hostfetch_store::{WalkCache, context_hash};
//!
//! let mut walks = WalkCache::new(base.join("snmp_walks").join("router1"));
//! walks.load().await;
//! let key = WalkCacheKey::new(".1.3.6.1.2.1.1.5", context_hash(""), true);
//! walks.insert(key, rows);
//! walks.save().await;
//! ```

pub mod error;
pub mod file_cache;
pub mod persistence;
pub mod section_cache;
pub mod walk_cache;

pub use error::StoreError;
pub use file_cache::{DiskFileCache, FileCacheConfig, FileCacheMode, MaxAge, NoCache, RawCodec};
pub use persistence::{
    default_cache_dir, ensure_dir, list_files, load_json, load_json_or_miss, save_bytes, save_json,
};
pub use section_cache::{
    CachedSection, ConfiguredFetchIntervallCache, SectionCacheEntry, list_section_cache,
};
pub use walk_cache::{WalkCache, WalkCacheKey, context_hash};
