//! The incident taxonomy: codes `A1..A11` and severities `S1..S4`.
//!
//! This table is the single source of truth for default severities; the
//! rules engine (`proctor-rules`) and the analysis emitter (`proctor-analysis`)
//! both look codes up here rather than hard-coding defaults twice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity level of an incident. Ordered `S1 < S2 < S3 < S4` so escalation
/// rules can take the max of several candidate levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    S1,
    S2,
    S3,
    S4,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::S1 => "S1",
            Severity::S2 => "S2",
            Severity::S3 => "S3",
            Severity::S4 => "S4",
        };
        f.write_str(s)
    }
}

/// A code from the incident taxonomy, `A1` through `A11`.
///
/// Tags outside this set are not an error — the rules engine passes them
/// through unchanged (§4.4 Failures) — so callers that need to distinguish
/// "known code" from "arbitrary tag" should go through [`IncidentCode::parse`]
/// rather than assuming every tag resolves to a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentCode {
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
    A10,
    A11,
}

impl IncidentCode {
    pub const ALL: [IncidentCode; 11] = [
        IncidentCode::A1,
        IncidentCode::A2,
        IncidentCode::A3,
        IncidentCode::A4,
        IncidentCode::A5,
        IncidentCode::A6,
        IncidentCode::A7,
        IncidentCode::A8,
        IncidentCode::A9,
        IncidentCode::A10,
        IncidentCode::A11,
    ];

    /// Parse a raw wire tag into a known taxonomy code, if it is one.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "A3" => Some(Self::A3),
            "A4" => Some(Self::A4),
            "A5" => Some(Self::A5),
            "A6" => Some(Self::A6),
            "A7" => Some(Self::A7),
            "A8" => Some(Self::A8),
            "A9" => Some(Self::A9),
            "A10" => Some(Self::A10),
            "A11" => Some(Self::A11),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::A6 => "A6",
            Self::A7 => "A7",
            Self::A8 => "A8",
            Self::A9 => "A9",
            Self::A10 => "A10",
            Self::A11 => "A11",
        }
    }

    /// The code's default severity, per the taxonomy table.
    pub fn default_level(self) -> Severity {
        match self {
            Self::A1 => Severity::S1,
            Self::A2 => Severity::S2,
            Self::A3 => Severity::S1,
            Self::A4 => Severity::S2,
            Self::A5 => Severity::S2,
            Self::A6 => Severity::S2,
            Self::A7 => Severity::S2,
            Self::A8 => Severity::S1,
            Self::A9 => Severity::S2,
            Self::A10 => Severity::S3,
            Self::A11 => Severity::S1,
        }
    }

    /// Short human-readable description, used in analysis-frame alerts.
    pub fn description(self) -> &'static str {
        match self {
            Self::A1 => "Face absent",
            Self::A2 => "Multiple faces",
            Self::A3 => "Tab / focus switch",
            Self::A4 => "Screen share missing",
            Self::A5 => "Prohibited material",
            Self::A6 => "Conversational audio",
            Self::A7 => "Prohibited device",
            Self::A8 => "Excessive motion",
            Self::A9 => "Environment tamper",
            Self::A10 => "Impersonation (face mismatch)",
            Self::A11 => "Idle",
        }
    }
}

impl fmt::Display for IncidentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_levels_match_table() {
        assert_eq!(IncidentCode::A1.default_level(), Severity::S1);
        assert_eq!(IncidentCode::A2.default_level(), Severity::S2);
        assert_eq!(IncidentCode::A10.default_level(), Severity::S3);
    }

    #[test]
    fn severity_ordering_supports_max() {
        assert!(Severity::S1 < Severity::S2);
        assert_eq!(Severity::S2.max(Severity::S3), Severity::S3);
    }

    #[test]
    fn unknown_tag_does_not_parse() {
        assert_eq!(IncidentCode::parse("Z9"), None);
    }
}
