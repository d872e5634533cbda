//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::{CacheReport, FetchOutcome, FetchReport, Payload, SectionReport};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a fetch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutput<'a> {
    pub hostname: &'a str,
    pub fetcher: String,
    pub mode: &'a str,
    pub trigger: &'a str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<&'a str>,
}

/// A fetcher fault.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput<'a> {
    pub kind: &'a str,
    pub message: &'a str,
}

/// Agent output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    pub bytes: usize,
    pub text: String,
}

/// JSON output for the cache command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOutput<'a> {
    pub hostname: &'a str,
    pub walk_cache_dir: String,
    pub walks: Vec<WalkOutput<'a>>,
    pub section_cache_dir: String,
    pub sections: Vec<SectionOutput<'a>>,
}

/// One persisted walk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkOutput<'a> {
    pub oid: &'a str,
    pub context_hash: &'a str,
}

/// One interval-cached section.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOutput<'a> {
    pub section: &'a str,
    #[serde(serialize_with = "serialize_datetime")]
    pub captured_at: DateTime<Utc>,
    pub tables: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_datetime_opt"
    )]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

fn serialize_datetime<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dt.to_rfc3339())
}

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S: Serializer>(
    dt: &Option<DateTime<Utc>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_string<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }

    /// Formats the result of a fetch.
    pub fn format_fetch(&self, report: &FetchReport) -> Result<String> {
        let mut output = FetchOutput {
            hostname: report.hostname.as_str(),
            fetcher: report.fetcher.to_string(),
            mode: report.mode.as_str(),
            trigger: report.trigger,
            ok: false,
            payload: None,
            error: None,
            cancelled: None,
        };

        match &report.outcome {
            FetchOutcome::Payload(payload) => {
                output.ok = true;
                output.payload = Some(payload_value(payload)?);
            }
            FetchOutcome::Fault { kind, message } => {
                output.error = Some(ErrorOutput { kind, message });
            }
            FetchOutcome::Cancelled(reason) => output.cancelled = Some(reason.as_str()),
        }

        self.to_string(&output)
    }

    /// Formats the cache listing of a host.
    pub fn format_cache(&self, report: &CacheReport) -> Result<String> {
        let output = CacheOutput {
            hostname: report.hostname.as_str(),
            walk_cache_dir: report.walk_cache_dir.display().to_string(),
            walks: report
                .walks
                .iter()
                .map(|key| WalkOutput {
                    oid: &key.fetchoid,
                    context_hash: &key.context_hash,
                })
                .collect(),
            section_cache_dir: report.section_cache_dir.display().to_string(),
            sections: report.sections.iter().map(section_output).collect(),
        };
        self.to_string(&output)
    }
}

fn payload_value(payload: &Payload) -> Result<Value> {
    Ok(match payload {
        Payload::Agent(raw) => serde_json::to_value(AgentOutput {
            bytes: raw.as_bytes().len(),
            text: raw.to_text_lossy(),
        })?,
        Payload::Snmp(raw) => serde_json::to_value(raw)?,
    })
}

fn section_output(report: &SectionReport) -> SectionOutput<'_> {
    SectionOutput {
        section: &report.entry.section,
        captured_at: report.entry.captured_at,
        tables: report.entry.tables,
        validity: report.validity,
        valid_until: report.valid_until,
        valid: report.valid,
    }
}
