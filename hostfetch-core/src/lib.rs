// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # hostfetch Core
//!
//! Core types and models shared by all hostfetch crates.
//!
//! This crate provides the foundational vocabulary of the data-fetcher
//! layer:
//!
//! - Why a fetch is happening ([`Mode`])
//! - What is being fetched ([`SectionName`], [`HostName`])
//! - What comes back ([`AgentRawData`], [`SnmpRawData`], [`SectionMarker`])
//! - Which SNMP sections exist and how they are queried
//!   ([`SnmpTree`], [`SnmpDetectSpec`], [`SnmpSectionMeta`])
//!
//! ## Key Types
//!
//! ### Selection
//! - [`Mode`] - Closed set of fetch reasons driving section selection
//! - [`SnmpSectionMeta`] - Per-section checking/disabled/redetect flags
//!
//! ### Raw Data
//! - [`AgentRawData`] - Opaque agent payload bytes
//! - [`SnmpValue`], [`SnmpTable`], [`SnmpRawSection`] - Walked SNMP data
//! - [`SectionMarker`] - Output key annotating cache provenance

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Selection
    Mode,
    // Names
    HostName,
    SectionName,
    // Raw data
    AgentRawData,
    SectionMarker,
    SnmpRawData,
    SnmpRawSection,
    SnmpRowInfo,
    SnmpTable,
    SnmpValue,
    // SNMP plugin description
    OidEncoding,
    OidSpec,
    SnmpDetectAtom,
    SnmpDetectSpec,
    SnmpPluginStore,
    SnmpPluginStoreItem,
    SnmpSectionMeta,
    SnmpTree,
};
