//! Integration tests for core model types.

use hostfetch_core::{SectionMarker, SectionName, SnmpDetectSpec, SnmpSectionMeta};

#[test]
fn test_marker_display_parse_roundtrip() {
    for rendered in ["cpu", "if64:cached(1000,300)", "mem:cached(0,60)"] {
        let marker = SectionMarker::parse(rendered).unwrap();
        assert_eq!(marker.to_string(), rendered);
    }
}

#[test]
fn test_marker_orders_by_section_name() {
    let a = SectionMarker::plain(SectionName::new("a").unwrap());
    let b = SectionMarker::cached(SectionName::new("b").unwrap(), 1, 1);
    assert!(a < b);
}

#[test]
fn test_section_meta_mapping_ignores_unknown_keys() {
    let mut map = SnmpSectionMeta::new(true, false, true).to_mapping();
    map.insert("fetch_interval".to_string(), serde_json::Value::Null);
    assert_eq!(
        SnmpSectionMeta::from_mapping(&map).unwrap(),
        SnmpSectionMeta::new(true, false, true)
    );
}

#[test]
fn test_detect_spec_oids() {
    let spec: SnmpDetectSpec = serde_json::from_str(
        r#"[[{"oid": ".1", "regex": "a", "expect_match": true}],
            [{"oid": ".2", "regex": "b", "expect_match": false}]]"#,
    )
    .unwrap();
    assert_eq!(spec.oids().collect::<Vec<_>>(), vec![".1", ".2"]);
}
