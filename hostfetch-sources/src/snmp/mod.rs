//! SNMP data source.
//!
//! [`SnmpFetcher`] decides which sections apply to a device, fetches their
//! tables through an [`SnmpBackend`] and merges in sections that are still
//! valid in the interval cache. Sections are fetched one at a time; CPU
//! sections go first so later walks do not inflate the device's load.

pub mod backend;
pub mod config;
pub mod detect;
pub mod fetcher;
pub mod selection;
pub mod table;


pub use backend::{BackendFactory, SnmpBackend, StoredWalkBackend};
pub use config::{
    FetchIntervals, OnError, SectionSelection, SnmpBackendKind, SnmpFetcherConfig, SnmpHostConfig,
    SnmpScanConfig,
};
pub use detect::gather_available_raw_section_names;
pub use fetcher::SnmpFetcher;
pub use selection::{SectionMetas, sort_sections};
pub use table::get_snmp_table;
