//! CLI output formatting tests.
//!
//! These tests verify that fetch results and cache listings are formatted
//! correctly for both text and JSON output modes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use hostfetch_core::{AgentRawData, HostName, Mode, SectionMarker, SectionName, SnmpValue};
use hostfetch_fetch::FetcherType;
use hostfetch_store::{SectionCacheEntry, WalkCacheKey};

use super::{
    CacheReport, FetchOutcome, FetchReport, JsonFormatter, Payload, SectionReport, TextFormatter,
};

fn report(fetcher: FetcherType, outcome: FetchOutcome) -> FetchReport {
    FetchReport {
        hostname: HostName::new("switch-07").unwrap(),
        fetcher,
        mode: Mode::Checking,
        trigger: "plain",
        outcome,
    }
}

fn snmp_payload() -> Payload {
    let uptime = SectionName::new("snmp_uptime").unwrap();
    let if64 = SectionName::new("if64").unwrap();
    Payload::Snmp(BTreeMap::from([
        (
            SectionMarker::plain(uptime),
            vec![vec![vec![SnmpValue::text("123456")]]],
        ),
        (
            SectionMarker::cached(if64, 1000, 300),
            vec![vec![
                vec![SnmpValue::text("1"), SnmpValue::text("lo")],
                vec![SnmpValue::text("2"), SnmpValue::text("eth0")],
            ]],
        ),
    ]))
}

fn cache_report() -> CacheReport {
    let now = Utc.timestamp_opt(1_700_000_200, 0).unwrap();
    let entry = |section: &str, captured_at: i64| SectionCacheEntry {
        section: section.to_string(),
        captured_at: Utc.timestamp_opt(captured_at, 0).unwrap(),
        tables: 1,
    };
    CacheReport {
        hostname: HostName::new("switch-07").unwrap(),
        walk_cache_dir: PathBuf::from("/cache/snmp_walk_cache/switch-07"),
        walks: vec![WalkCacheKey::new(".1.3.6.1.2.1.2.2.1.2", "e3b0c44298fc1c14", true)],
        section_cache_dir: PathBuf::from("/cache/snmp_section_cache/switch-07"),
        sections: vec![
            SectionReport::new(entry("if64", 1_700_000_000), Some(300), now),
            SectionReport::new(entry("mem", 1_700_000_000), Some(60), now),
            SectionReport::new(entry("lldp", 1_700_000_000), None, now),
        ],
    }
}

// ============================================================================
// Text
// ============================================================================

#[test]
fn test_text_agent_payload() {
    let formatter = TextFormatter::new(false);
    let output = formatter.format_fetch(&report(
        FetcherType::Tcp,
        FetchOutcome::Payload(Payload::Agent(AgentRawData::from(
            b"<<<check_mk>>>\nVersion: 2.3.0\n".as_slice(),
        ))),
    ));
    assert_eq!(
        output,
        "switch-07 (TCP, checking, plain trigger): OK\n<<<check_mk>>>\nVersion: 2.3.0"
    );
}

#[test]
fn test_text_empty_agent_payload() {
    let formatter = TextFormatter::new(false);
    let output = formatter.format_fetch(&report(
        FetcherType::Piggyback,
        FetchOutcome::Payload(Payload::Agent(AgentRawData::empty())),
    ));
    assert!(output.ends_with("(empty payload)"));
}

#[test]
fn test_text_snmp_sections() {
    let formatter = TextFormatter::new(false);
    let output = formatter.format_fetch(&report(
        FetcherType::Snmp,
        FetchOutcome::Payload(snmp_payload()),
    ));

    assert!(output.contains("[if64:cached(1000,300)]\n  1 | lo\n  2 | eth0"));
    assert!(output.contains("[snmp_uptime]\n  123456"));
}

#[test]
fn test_text_fault_and_cancel() {
    let formatter = TextFormatter::new(false);
    let fault = formatter.format_fetch(&report(
        FetcherType::Snmp,
        FetchOutcome::Fault {
            kind: "Snmp",
            message: "no applicable sections found".to_string(),
        },
    ));
    assert_eq!(
        fault,
        "switch-07 (SNMP, checking, plain trigger): FAILED Snmp: no applicable sections found"
    );

    let cancelled = formatter.format_fetch(&report(
        FetcherType::Program,
        FetchOutcome::Cancelled("timed out after 30s".to_string()),
    ));
    assert!(cancelled.ends_with("CANCELLED timed out after 30s"));
}

#[test]
fn test_text_colors() {
    let formatter = TextFormatter::new(true);
    let output = formatter.format_fetch(&report(
        FetcherType::Tcp,
        FetchOutcome::Fault {
            kind: "Connection",
            message: "refused".to_string(),
        },
    ));
    assert!(output.contains("\x1b[31m"), "faults should be red");
}

#[test]
fn test_text_cache_listing() {
    let formatter = TextFormatter::new(false);
    let output = formatter.format_cache(&cache_report());

    assert!(output.contains("Walk cache: /cache/snmp_walk_cache/switch-07 (1 entry)"));
    assert!(output.contains("  .1.3.6.1.2.1.2.2.1.2  context e3b0c44298fc1c14"));
    assert!(output.contains("Section cache: /cache/snmp_section_cache/switch-07 (3 entries)"));
    assert!(output.contains("if64  captured 2023-11-14 22:13:20 UTC  1 table  valid until 2023-11-14 22:18:20 UTC"));
    assert!(output.contains("mem  captured 2023-11-14 22:13:20 UTC  1 table  expired"));
    assert!(output.contains("lldp  captured 2023-11-14 22:13:20 UTC  1 table  no interval configured"));
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn test_json_agent_payload() {
    let formatter = JsonFormatter::new(false);
    let output = formatter
        .format_fetch(&report(
            FetcherType::Program,
            FetchOutcome::Payload(Payload::Agent(AgentRawData::from(b"<<<local>>>".as_slice()))),
        ))
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["fetcher"], "Program");
    assert_eq!(json["mode"], "checking");
    assert_eq!(json["payload"]["bytes"], 11);
    assert_eq!(json["payload"]["text"], "<<<local>>>");
    assert!(json.get("error").is_none());
}

#[test]
fn test_json_snmp_payload_keys_are_markers() {
    let formatter = JsonFormatter::new(true);
    let output = formatter
        .format_fetch(&report(FetcherType::Snmp, FetchOutcome::Payload(snmp_payload())))
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    let payload = json["payload"].as_object().unwrap();
    assert!(payload.contains_key("if64:cached(1000,300)"));
    assert!(payload.contains_key("snmp_uptime"));
}

#[test]
fn test_json_fault() {
    let formatter = JsonFormatter::new(false);
    let output = formatter
        .format_fetch(&report(
            FetcherType::Tcp,
            FetchOutcome::Fault {
                kind: "NoData",
                message: "Got no data".to_string(),
            },
        ))
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["kind"], "NoData");
    assert_eq!(json["error"]["message"], "Got no data");
    assert!(json.get("payload").is_none());
}

#[test]
fn test_json_cache_listing() {
    let formatter = JsonFormatter::new(false);
    let output = formatter.format_cache(&cache_report()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["walks"][0]["contextHash"], "e3b0c44298fc1c14");
    assert_eq!(json["sections"][0]["valid"], true);
    assert_eq!(json["sections"][0]["validUntil"], "2023-11-14T22:18:20+00:00");
    assert_eq!(json["sections"][1]["valid"], false);
    assert!(json["sections"][2].get("valid").is_none());
}
