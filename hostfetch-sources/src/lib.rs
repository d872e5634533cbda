// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # hostfetch sources
//!
//! Concrete fetchers for the data sources a monitored host can have.
//!
//! | Fetcher | Payload | Source |
//! |---------|---------|--------|
//! | [`SnmpFetcher`] | [`SnmpRawData`](hostfetch_core::SnmpRawData) | SNMP device, through an [`SnmpBackend`] |
//! | [`TcpFetcher`] | [`AgentRawData`](hostfetch_core::AgentRawData) | Agent listening on TCP |
//! | [`ProgramFetcher`] | [`AgentRawData`](hostfetch_core::AgentRawData) | External data-source program |
//! | [`PiggybackFetcher`] | [`AgentRawData`](hostfetch_core::AgentRawData) | Delivered by other hosts |
//!
//! All of them implement [`Fetcher`](hostfetch_fetch::Fetcher) and are
//! driven through a trigger:
//!
//! ```ignore
//! use hostfetch_fetch::{FetcherTrigger, NoSecrets, PlainFetcherTrigger};
//! use hostfetch_sources::TcpFetcher;
//! use hostfetch_store::NoCache;
//!
//! let mut fetcher = TcpFetcher::new("10.0.0.5", 6556);
//! let cache = NoCache::new(hostname);
//! let result = PlainFetcherTrigger
//!     .get_raw_data(&cache, &mut fetcher, Mode::Checking, &NoSecrets)
//!     .await?;
//! ```

pub mod piggyback;
pub mod program;
pub mod snmp;
pub mod tcp;

pub use piggyback::PiggybackFetcher;
pub use program::ProgramFetcher;
pub use snmp::{
    BackendFactory, OnError, SectionSelection, SnmpBackend, SnmpBackendKind, SnmpFetcher,
    SnmpFetcherConfig, SnmpHostConfig, StoredWalkBackend,
};
pub use tcp::{DEFAULT_AGENT_PORT, TcpFetcher};
