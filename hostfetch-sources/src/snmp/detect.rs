//! Section detection.
//!
//! A section applies to a device if its detection spec matches: any of its
//! AND-lists must have every atom satisfied. Each atom fetches one OID and
//! matches a regex against the start of the value.

use std::collections::{BTreeSet, HashMap};

use hostfetch_core::{SectionName, SnmpDetectAtom, SnmpDetectSpec};
use hostfetch_fetch::{FetchFailure, FetcherError};
use regex::{Regex, RegexBuilder};
use tracing::{debug, instrument, warn};

use super::backend::SnmpBackend;
use super::config::{OnError, SnmpScanConfig};

/// sysDescr.0
pub const OID_SYS_DESCR: &str = ".1.3.6.1.2.1.1.1.0";
/// sysObjectID.0
pub const OID_SYS_OBJECT_ID: &str = ".1.3.6.1.2.1.1.2.0";

/// Regex that, with `expect_match = false`, tests for a missing OID.
const EXISTS_PATTERN: &str = ".*";

/// OID values fetched and patterns compiled during one detection run.
struct DetectionCache<'a> {
    backend: &'a mut dyn SnmpBackend,
    values: HashMap<String, Option<String>>,
    patterns: HashMap<String, Regex>,
}

impl<'a> DetectionCache<'a> {
    fn new(backend: &'a mut dyn SnmpBackend) -> Self {
        Self {
            backend,
            values: HashMap::new(),
            patterns: HashMap::new(),
        }
    }

    async fn get(&mut self, oid: &str) -> Result<Option<String>, FetchFailure> {
        if let Some(value) = self.values.get(oid) {
            return Ok(value.clone());
        }
        let value = self
            .backend
            .get(oid, "")
            .await?
            .map(|v| v.as_text().into_owned());
        self.values.insert(oid.to_string(), value.clone());
        Ok(value)
    }

    fn is_match(&mut self, pattern: &str, value: &str) -> Result<bool, FetcherError> {
        if let Some(regex) = self.patterns.get(pattern) {
            return Ok(regex.is_match(value));
        }
        let regex = compile(pattern)?;
        let matched = regex.is_match(value);
        self.patterns.insert(pattern.to_string(), regex);
        Ok(matched)
    }
}

/// Anchors `pattern` at the value start. Matching ignores case and `.`
/// crosses line breaks, as device descriptions often span lines.
fn compile(pattern: &str) -> Result<Regex, FetcherError> {
    RegexBuilder::new(&format!("^(?:{pattern})"))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| FetcherError::Snmp(format!("Invalid detection pattern {pattern:?}: {e}")))
}

async fn evaluate_atom(
    atom: &SnmpDetectAtom,
    cache: &mut DetectionCache<'_>,
) -> Result<bool, FetchFailure> {
    let Some(value) = cache.get(&atom.oid).await? else {
        // Only "does not exist" matches a missing object.
        return Ok(atom.regex == EXISTS_PATTERN && !atom.expect_match);
    };
    let matched = cache.is_match(&atom.regex, &value)?;
    Ok(matched == atom.expect_match)
}

async fn evaluate_spec(
    spec: &SnmpDetectSpec,
    cache: &mut DetectionCache<'_>,
) -> Result<bool, FetchFailure> {
    for all_of in &spec.0 {
        let mut all_matched = true;
        for atom in all_of {
            if !evaluate_atom(atom, cache).await? {
                all_matched = false;
                break;
            }
        }
        if all_matched {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns the sections whose detection spec matches the device.
///
/// sysDescr and sysObjectID are fetched first. A device without sysDescr
/// is an error unless `missing_sys_description` is set. Faults while
/// evaluating one section are handled per `on_error`; cancellation always
/// propagates.
#[instrument(skip_all, fields(host = %backend.hostname(), candidates = sections.len()))]
pub async fn gather_available_raw_section_names(
    sections: &[(SectionName, SnmpDetectSpec)],
    scan_config: &SnmpScanConfig,
    backend: &mut dyn SnmpBackend,
) -> Result<BTreeSet<SectionName>, FetchFailure> {
    if sections.is_empty() {
        return Ok(BTreeSet::new());
    }

    let mut cache = DetectionCache::new(backend);

    let sys_descr = cache.get(OID_SYS_DESCR).await?;
    cache.get(OID_SYS_OBJECT_ID).await?;
    if sys_descr.is_none() && !scan_config.missing_sys_description {
        return Err(FetcherError::Snmp("Cannot fetch system description OID".to_string()).into());
    }

    let mut found = BTreeSet::new();
    for (name, spec) in sections {
        match evaluate_spec(spec, &mut cache).await {
            Ok(true) => {
                found.insert(name.clone());
            }
            Ok(false) => {}
            Err(FetchFailure::Cancelled(cancelled)) => return Err(cancelled.into()),
            Err(FetchFailure::Error(err)) => match scan_config.on_error {
                OnError::Raise => return Err(err.into()),
                OnError::Warn => {
                    warn!(section = %name, error = %err, "Detection failed, skipping section");
                }
                OnError::Ignore => {}
            },
        }
    }

    debug!(found = found.len(), "Detection finished");
    Ok(found)
}

// ============================================================================
// Tests
// ============================================================================
