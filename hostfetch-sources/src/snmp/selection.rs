//! Section selection per mode, and the order sections are fetched in.
//!
//! | Mode | Static | Detected |
//! |---|---|---|
//! | Checking | `checking && !redetect`, not disabled | `checking && redetect` (plus inventory sections if status-data inventory is on), not disabled, not static |
//! | ForceSections | `checking` | none |
//! | Inventory | none | inventory sections, not disabled |
//! | Discovery | none | every known section, not disabled |
//! | Rtc, None | none | none |

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use hostfetch_core::{Mode, SectionName, SnmpPluginStore, SnmpSectionMeta};

/// Sections that hit the device CPU without saying so in their name.
pub const CPU_SECTIONS_WITHOUT_CPU_IN_NAME: [&str; 2] = ["brocade_sys", "bvip_util"];

/// Per-section selection flags of one host.
pub type SectionMetas = BTreeMap<SectionName, SnmpSectionMeta>;

fn is_disabled(sections: &SectionMetas, name: &SectionName) -> bool {
    sections.get(name).is_some_and(|meta| meta.disabled)
}

/// Sections selected without contacting the device.
pub fn static_selection(sections: &SectionMetas, mode: Mode) -> BTreeSet<SectionName> {
    let pick = |keep: fn(&SnmpSectionMeta) -> bool| -> BTreeSet<SectionName> {
        sections
            .iter()
            .filter(|(_, meta)| keep(meta))
            .map(|(name, _)| name.clone())
            .collect()
    };

    match mode {
        Mode::Checking => pick(|meta| meta.checking && !meta.redetect && !meta.disabled),
        Mode::ForceSections => pick(|meta| meta.checking),
        Mode::Discovery | Mode::Inventory | Mode::Rtc | Mode::None => BTreeSet::new(),
    }
}

/// Sections that must be probed on the device.
pub fn detection_candidates(
    sections: &SectionMetas,
    plugin_store: &SnmpPluginStore,
    mode: Mode,
    do_status_data_inventory: bool,
) -> BTreeSet<SectionName> {
    let candidates: BTreeSet<SectionName> = match mode {
        Mode::Checking => {
            let mut names: BTreeSet<SectionName> = sections
                .iter()
                .filter(|(_, meta)| meta.checking && meta.redetect)
                .map(|(name, _)| name.clone())
                .collect();
            if do_status_data_inventory {
                names.extend(plugin_store.inventory_sections());
            }
            let already = static_selection(sections, mode);
            names.retain(|name| !already.contains(name));
            names
        }
        Mode::Inventory => plugin_store.inventory_sections(),
        Mode::Discovery => plugin_store.names(),
        Mode::ForceSections | Mode::Rtc | Mode::None => BTreeSet::new(),
    };

    candidates
        .into_iter()
        .filter(|name| !is_disabled(sections, name))
        .collect()
}

/// Whether a section is fetched before the others.
pub fn is_cpu_section(name: &SectionName) -> bool {
    name.as_str().contains("cpu") || CPU_SECTIONS_WITHOUT_CPU_IN_NAME.contains(&name.as_str())
}

/// Fetch order: CPU sections first. Within each group names are in
/// descending order.
pub fn sort_sections<'a>(names: impl IntoIterator<Item = &'a SectionName>) -> Vec<SectionName> {
    let mut sorted: Vec<SectionName> = names.into_iter().cloned().collect();
    sorted.sort_by_key(|name| Reverse((is_cpu_section(name), name.clone())));
    sorted
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hostfetch_core::{SnmpDetectSpec, SnmpPluginStoreItem};

    fn name(s: &str) -> SectionName {
        SectionName::new(s).unwrap()
    }

    fn names(list: &[&str]) -> BTreeSet<SectionName> {
        list.iter().map(|s| name(s)).collect()
    }

    /// checking, disabled, redetect
    fn fixture() -> SectionMetas {
        BTreeMap::from([
            (name("plain"), SnmpSectionMeta::new(true, false, false)),
            (name("redetected"), SnmpSectionMeta::new(true, false, true)),
            (name("off"), SnmpSectionMeta::new(true, true, false)),
            (name("off_redetect"), SnmpSectionMeta::new(true, true, true)),
            (name("unchecked"), SnmpSectionMeta::new(false, false, false)),
            (name("inv_only"), SnmpSectionMeta::new(false, false, false)),
        ])
    }

    fn store() -> SnmpPluginStore {
        let item = |inventory| SnmpPluginStoreItem {
            trees: Vec::new(),
            detect_spec: SnmpDetectSpec::always(),
            inventory,
        };
        SnmpPluginStore::new(BTreeMap::from([
            (name("plain"), item(false)),
            (name("redetected"), item(false)),
            (name("off"), item(true)),
            (name("off_redetect"), item(false)),
            (name("unchecked"), item(false)),
            (name("inv_only"), item(true)),
        ]))
    }

    #[test]
    fn test_static_selection_per_mode() {
        let sections = fixture();
        assert_eq!(static_selection(&sections, Mode::Checking), names(&["plain"]));
        assert_eq!(
            static_selection(&sections, Mode::ForceSections),
            names(&["plain", "redetected", "off", "off_redetect"])
        );
        for mode in [Mode::Discovery, Mode::Inventory, Mode::Rtc, Mode::None] {
            assert!(static_selection(&sections, mode).is_empty(), "{mode}");
        }
    }

    #[test]
    fn test_detection_candidates_per_mode() {
        let sections = fixture();
        let store = store();

        assert_eq!(
            detection_candidates(&sections, &store, Mode::Checking, false),
            names(&["redetected"])
        );
        assert_eq!(
            detection_candidates(&sections, &store, Mode::Checking, true),
            names(&["redetected", "inv_only"])
        );
        assert_eq!(
            detection_candidates(&sections, &store, Mode::Inventory, false),
            names(&["inv_only"])
        );
        assert_eq!(
            detection_candidates(&sections, &store, Mode::Discovery, false),
            names(&["plain", "redetected", "unchecked", "inv_only"])
        );
        for mode in [Mode::ForceSections, Mode::Rtc, Mode::None] {
            assert!(
                detection_candidates(&sections, &store, mode, true).is_empty(),
                "{mode}"
            );
        }
    }

    #[test]
    fn test_cpu_sections() {
        assert!(is_cpu_section(&name("hr_cpu")));
        assert!(is_cpu_section(&name("bvip_util")));
        assert!(is_cpu_section(&name("brocade_sys")));
        assert!(!is_cpu_section(&name("if64")));
    }

    #[test]
    fn test_sort_order() {
        let input = [name("if64"), name("cpu"), name("bvip_util"), name("mem")];
        let sorted: Vec<String> = sort_sections(&input)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(sorted, vec!["cpu", "bvip_util", "mem", "if64"]);
    }
}
