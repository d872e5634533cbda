//! Fetch modes.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Mode
// ============================================================================

/// The reason a fetch cycle is running.
///
/// The mode drives every selection decision of the SNMP fetcher and the
/// per-mode max age of the byte-level file cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No particular reason; nothing is selected.
    #[default]
    None,
    /// Regular status checking.
    Checking,
    /// Service discovery.
    Discovery,
    /// Hardware/software inventory.
    Inventory,
    /// Real-time checks.
    #[serde(rename = "rtc")]
    Rtc,
    /// Explicit section selection forced by the caller.
    ForceSections,
}

impl Mode {
    /// All modes, in declaration order.
    pub const ALL: [Mode; 6] = [
        Mode::None,
        Mode::Checking,
        Mode::Discovery,
        Mode::Inventory,
        Mode::Rtc,
        Mode::ForceSections,
    ];

    /// Returns the lowercase identifier used in logs and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Checking => "checking",
            Self::Discovery => "discovery",
            Self::Inventory => "inventory",
            Self::Rtc => "rtc",
            Self::ForceSections => "force_sections",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown mode: {s}"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_roundtrip() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert!("bogus".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_default_is_none() {
        assert_eq!(Mode::default(), Mode::None);
    }
}
