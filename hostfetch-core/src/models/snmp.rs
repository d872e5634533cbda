//! SNMP section description types.
//!
//! These describe *what* a section needs from a device (trees to walk and
//! a detection specification) and *how* the section takes part in
//! selection ([`SnmpSectionMeta`]). How plugins declare them is outside
//! this crate; the types only carry the result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::names::SectionName;
use crate::error::CoreError;

// ============================================================================
// OID Specification
// ============================================================================

/// How the values of one column are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OidEncoding {
    /// Decoded text.
    #[default]
    String,
    /// Raw octets.
    Binary,
}

/// One column of an SNMP tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OidSpec {
    /// Column OID, relative to the tree base (e.g. `"2.1"`).
    pub column: String,
    /// Value encoding.
    #[serde(default)]
    pub encoding: OidEncoding,
    /// Whether walk results may be kept across cycles (rarely changing data).
    #[serde(default)]
    pub save_to_cache: bool,
}

impl OidSpec {
    /// Creates a text column that is not persisted across cycles.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            encoding: OidEncoding::String,
            save_to_cache: false,
        }
    }

    /// Marks the column as rarely changing.
    #[must_use]
    pub fn cached(mut self) -> Self {
        self.save_to_cache = true;
        self
    }

    /// Marks the column as binary.
    #[must_use]
    pub fn binary(mut self) -> Self {
        self.encoding = OidEncoding::Binary;
        self
    }
}

/// A table to walk: a base OID and its columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnmpTree {
    /// Base OID (e.g. `".1.3.6.1.2.1.2.2.1"`).
    pub base: String,
    /// Columns below the base.
    pub oids: Vec<OidSpec>,
}

impl SnmpTree {
    /// Creates a tree.
    pub fn new(base: impl Into<String>, oids: Vec<OidSpec>) -> Self {
        Self {
            base: base.into(),
            oids,
        }
    }

    /// The full OID walked for one column.
    pub fn fetch_oid(&self, spec: &OidSpec) -> String {
        format!(
            "{}.{}",
            self.base.trim_end_matches('.'),
            spec.column.trim_start_matches('.')
        )
    }
}

// ============================================================================
// Detection Specification
// ============================================================================

/// One detection condition: the value at `oid` must (or must not) match `regex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnmpDetectAtom {
    /// OID to fetch.
    pub oid: String,
    /// Pattern matched against the start of the value.
    pub regex: String,
    /// Whether the pattern is expected to match.
    pub expect_match: bool,
}

impl SnmpDetectAtom {
    /// Creates a detection condition.
    pub fn new(oid: impl Into<String>, regex: impl Into<String>, expect_match: bool) -> Self {
        Self {
            oid: oid.into(),
            regex: regex.into(),
            expect_match,
        }
    }
}

/// Disjunction of conjunctions of detection conditions.
///
/// `[[]]` always matches, `[]` never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SnmpDetectSpec(pub Vec<Vec<SnmpDetectAtom>>);

impl SnmpDetectSpec {
    /// A spec that matches every device.
    pub fn always() -> Self {
        Self(vec![Vec::new()])
    }

    /// A spec that never matches.
    pub fn never() -> Self {
        Self(Vec::new())
    }

    /// Every OID referenced by the spec.
    pub fn oids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flatten().map(|atom| atom.oid.as_str())
    }
}

// ============================================================================
// Plugin Store
// ============================================================================

/// What one section needs from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpPluginStoreItem {
    /// Trees to walk, in output order.
    pub trees: Vec<SnmpTree>,
    /// Condition under which the section applies to a device.
    pub detect_spec: SnmpDetectSpec,
    /// Whether the section feeds the inventory.
    #[serde(default)]
    pub inventory: bool,
}

/// All known SNMP sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SnmpPluginStore(pub BTreeMap<SectionName, SnmpPluginStoreItem>);

impl SnmpPluginStore {
    /// Creates a store from its items.
    pub fn new(items: BTreeMap<SectionName, SnmpPluginStoreItem>) -> Self {
        Self(items)
    }

    /// Looks up a section.
    pub fn get(&self, name: &SectionName) -> Option<&SnmpPluginStoreItem> {
        self.0.get(name)
    }

    /// Every known section name.
    pub fn names(&self) -> BTreeSet<SectionName> {
        self.0.keys().cloned().collect()
    }

    /// Sections relevant for inventory.
    pub fn inventory_sections(&self) -> BTreeSet<SectionName> {
        self.0
            .iter()
            .filter(|(_, item)| item.inventory)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

// ============================================================================
// Section Meta
// ============================================================================

/// Per (host, section) selection flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SnmpSectionMeta {
    /// The section takes part in checking.
    pub checking: bool,
    /// The section is administratively disabled.
    pub disabled: bool,
    /// The section must be re-detected every cycle.
    pub redetect: bool,
}

impl SnmpSectionMeta {
    /// Creates section metadata.
    pub fn new(checking: bool, disabled: bool, redetect: bool) -> Self {
        Self {
            checking,
            disabled,
            redetect,
        }
    }

    /// Converts into a plain key-value mapping.
    pub fn to_mapping(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("checking".to_string(), Value::Bool(self.checking));
        map.insert("disabled".to_string(), Value::Bool(self.disabled));
        map.insert("redetect".to_string(), Value::Bool(self.redetect));
        map
    }

    /// Reads metadata back from a key-value mapping.
    ///
    /// Unknown keys are ignored; missing or non-boolean keys are an error.
    pub fn from_mapping(map: &Map<String, Value>) -> Result<Self, CoreError> {
        let flag = |key: &str| {
            map.get(key)
                .and_then(Value::as_bool)
                .ok_or_else(|| CoreError::InvalidMapping(format!("missing boolean {key:?}")))
        };
        Ok(Self {
            checking: flag("checking")?,
            disabled: flag("disabled")?,
            redetect: flag("redetect")?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_oid_joins_base_and_column() {
        let tree = SnmpTree::new(".1.2.3", vec![OidSpec::new("4.5")]);
        assert_eq!(tree.fetch_oid(&tree.oids[0]), ".1.2.3.4.5");

        let tree = SnmpTree::new(".1.2.3.", vec![OidSpec::new(".4")]);
        assert_eq!(tree.fetch_oid(&tree.oids[0]), ".1.2.3.4");
    }

    #[test]
    fn test_section_meta_mapping_roundtrip() {
        for meta in [
            SnmpSectionMeta::new(false, false, false),
            SnmpSectionMeta::new(true, false, true),
            SnmpSectionMeta::new(true, true, false),
        ] {
            assert_eq!(SnmpSectionMeta::from_mapping(&meta.to_mapping()).unwrap(), meta);
        }
    }

    #[test]
    fn test_section_meta_mapping_missing_key() {
        let mut map = SnmpSectionMeta::default().to_mapping();
        map.remove("redetect");
        assert!(SnmpSectionMeta::from_mapping(&map).is_err());
    }

    #[test]
    fn test_inventory_sections() {
        let item = |inventory| SnmpPluginStoreItem {
            trees: Vec::new(),
            detect_spec: SnmpDetectSpec::always(),
            inventory,
        };
        let store = SnmpPluginStore::new(BTreeMap::from([
            (SectionName::new("a").unwrap(), item(true)),
            (SectionName::new("b").unwrap(), item(false)),
        ]));
        assert_eq!(
            store.inventory_sections(),
            BTreeSet::from([SectionName::new("a").unwrap()])
        );
    }
}
