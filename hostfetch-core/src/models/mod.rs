//! Domain models for hostfetch.
//!
//! ## Submodules
//!
//! - [`mode`] - Why a fetch is happening (Mode)
//! - [`names`] - Validated identifiers (SectionName, HostName)
//! - [`raw`] - Raw payloads and section markers
//! - [`snmp`] - SNMP plugin description and per-section metadata

mod mode;
mod names;
mod raw;
mod snmp;

// Re-export everything at the models level
pub use mode::Mode;
pub use names::{HostName, SectionName};
pub use raw::{
    AgentRawData, SectionMarker, SnmpRawData, SnmpRawSection, SnmpRowInfo, SnmpTable, SnmpValue,
};
pub use snmp::{
    OidEncoding, OidSpec, SnmpDetectAtom, SnmpDetectSpec, SnmpPluginStore, SnmpPluginStoreItem,
    SnmpSectionMeta, SnmpTree,
};
