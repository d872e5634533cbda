//! Raw payloads returned by fetchers.
//!
//! - [`AgentRawData`] - Opaque bytes from agents, programs and piggyback
//! - [`SnmpValue`] / [`SnmpTable`] - Values walked from SNMP devices
//! - [`SectionMarker`] - Section name annotated with cache provenance

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use super::names::SectionName;
use crate::error::CoreError;

// ============================================================================
// Agent Raw Data
// ============================================================================

/// Opaque agent payload.
///
/// Serialized as base64 so that arbitrary bytes survive JSON transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AgentRawData(pub Vec<u8>);

impl AgentRawData {
    /// Creates an empty payload.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns the payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if no bytes were received.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the payload as text, replacing invalid UTF-8.
    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<Vec<u8>> for AgentRawData {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for AgentRawData {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl Serialize for AgentRawData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for AgentRawData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SNMP Values
// ============================================================================

/// A single value returned by an SNMP get or walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnmpValue {
    /// Decoded textual value.
    Text(String),
    /// Undecoded octets.
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl SnmpValue {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the value as text, replacing invalid UTF-8 in binary values.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Text(text) => std::borrow::Cow::Borrowed(text),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Converts the value into raw octets.
    pub fn into_binary(self) -> Self {
        match self {
            Self::Text(text) => Self::Binary(text.into_bytes()),
            binary @ Self::Binary(_) => binary,
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// The `(oid, value)` pairs returned by one walk.
pub type SnmpRowInfo = Vec<(String, SnmpValue)>;

/// One table: rows of column values.
pub type SnmpTable = Vec<Vec<SnmpValue>>;

/// The raw data of one section: one table per declared tree.
pub type SnmpRawSection = Vec<SnmpTable>;

/// Result of an SNMP fetch: section marker to raw section data.
pub type SnmpRawData = BTreeMap<SectionMarker, SnmpRawSection>;

// ============================================================================
// Section Marker
// ============================================================================

/// A section name annotated with its interval-cache provenance.
///
/// Rendered as `name` for sections without a configured fetch interval,
/// and as `name:cached(<captured_at>,<validity>)` otherwise. Downstream
/// consumers use the rendered string to tell fresh from cached data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionMarker {
    name: SectionName,
    cached: Option<(i64, u64)>,
}

impl SectionMarker {
    /// Plain marker for a section without interval caching.
    pub fn plain(name: SectionName) -> Self {
        Self { name, cached: None }
    }

    /// Marker for a section taking part in the interval cache.
    pub fn cached(name: SectionName, captured_at: i64, validity: u64) -> Self {
        Self {
            name,
            cached: Some((captured_at, validity)),
        }
    }

    /// Builds a marker from an optional validity interval.
    pub fn new(name: SectionName, captured_at: i64, validity: Option<u64>) -> Self {
        match validity {
            Some(validity) => Self::cached(name, captured_at, validity),
            None => Self::plain(name),
        }
    }

    /// The section this marker refers to.
    pub fn name(&self) -> &SectionName {
        &self.name
    }

    /// `(captured_at, validity)` if the section is interval cached.
    pub fn cache_info(&self) -> Option<(i64, u64)> {
        self.cached
    }

    /// Parses a rendered marker.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidMarker(s.to_string());
        let Some((name, rest)) = s.split_once(':') else {
            return Ok(Self::plain(SectionName::new(s).map_err(|_| invalid())?));
        };
        let name = SectionName::new(name).map_err(|_| invalid())?;
        let args = rest
            .strip_prefix("cached(")
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let (captured_at, validity) = args.split_once(',').ok_or_else(invalid)?;
        let captured_at = captured_at.trim().parse().map_err(|_| invalid())?;
        let validity = validity.trim().parse().map_err(|_| invalid())?;
        Ok(Self::cached(name, captured_at, validity))
    }
}

impl fmt::Display for SectionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cached {
            Some((captured_at, validity)) => {
                write!(f, "{}:cached({captured_at},{validity})", self.name)
            }
            None => write!(f, "{}", self.name),
        }
    }
}

impl Serialize for SectionMarker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SectionMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> SectionName {
        SectionName::new(s).unwrap()
    }

    #[test]
    fn test_marker_formatting() {
        assert_eq!(
            SectionMarker::new(name("name"), 1000, Some(300)).to_string(),
            "name:cached(1000,300)"
        );
        assert_eq!(SectionMarker::new(name("name"), 1000, None).to_string(), "name");
    }

    #[test]
    fn test_marker_parse() {
        let marker = SectionMarker::parse("if64:cached(1700000000,600)").unwrap();
        assert_eq!(marker.name().as_str(), "if64");
        assert_eq!(marker.cache_info(), Some((1_700_000_000, 600)));

        let plain = SectionMarker::parse("mem").unwrap();
        assert_eq!(plain.cache_info(), None);

        assert!(SectionMarker::parse("mem:fresh").is_err());
        assert!(SectionMarker::parse("mem:cached(1)").is_err());
    }

    #[test]
    fn test_snmp_value_into_binary() {
        assert_eq!(
            SnmpValue::text("ab").into_binary(),
            SnmpValue::Binary(vec![b'a', b'b'])
        );
    }

    #[test]
    fn test_agent_raw_data_lossy_text() {
        let raw = AgentRawData::from(b"<<<check>>>\nok".as_slice());
        assert_eq!(raw.to_text_lossy(), "<<<check>>>\nok");
        assert!(!raw.is_empty());
        assert!(AgentRawData::empty().is_empty());
    }
}
