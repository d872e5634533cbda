// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # hostfetch Fetch
//!
//! The fetch contract shared by every data source, plus the orchestration
//! around it.
//!
//! ## Fetchers
//!
//! - [`fetcher::Fetcher`] - `open` / `fetch_from_io` / `close` per source
//! - [`fetcher::FetcherExt::fetch`] - the one wrapper callers use
//! - [`error`] - cancellation vs. fetcher faults
//!
//! ## Triggers
//!
//! - [`trigger::FetcherTrigger`] - file cache, secrets, fetcher, write back
//! - [`file_cache::FileCache`] - the byte-level cache a trigger consults
//!
//! ## Host APIs
//!
//! - [`host::process`] - Shell execution for data-source programs
//! - [`host::secrets`] - Secrets files that live for one fetch
//!
//! ## Example
//!
//! ```ignore
//! use hostfetch_fetch::{FetcherTrigger, NoSecrets, PlainFetcherTrigger};
//!
//! let result = PlainFetcherTrigger
//!     .get_raw_data(&file_cache, &mut fetcher, Mode::Checking, &NoSecrets)
//!     .await?; // `?` only propagates cancellation
//!
//! match result {
//!     Ok(raw) => process(raw),
//!     Err(fault) => report(fault),
//! }
//! ```

pub mod error;
pub mod fetcher;
pub mod file_cache;
pub mod host;
pub mod trigger;

#[cfg(test)]
mod trigger_tests;

// Errors
pub use error::{
    Cancelled, FetchFailure, FetchResult, FetcherError, ProcessError, SecretsError, TriggerError,
};

// Contract
pub use fetcher::{Fetcher, FetcherExt, FetcherType};
pub use file_cache::FileCache;

// Host APIs
pub use host::{
    process::{ProcessOutput, ProcessRunner},
    secrets::{
        AdHocSecrets, KeychainLookup, KeychainSecrets, NoSecrets, SecretFile, SecretRef,
        SecretsProvider, SystemKeychain,
    },
};

// Triggers
pub use trigger::{
    AnyTrigger, FetcherTrigger, PlainFetcherTrigger, TimeoutFetcherTrigger, TriggerIdentity,
    TriggerParams,
};
