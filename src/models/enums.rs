use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Clinical severity tag shared by risk alerts and omissions.
///
/// Ordering follows the fixed clinical ranking: LOW < MEDIUM < HIGH < CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskSeverity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Score contributed by an alert at this severity.
    pub fn score(self) -> u32 {
        match self {
            Self::Low => 25,
            Self::Medium => 50,
            Self::High => 75,
            Self::Critical => 100,
        }
    }
}

impl fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskSeverity {
    type Err = InvalidEnum;

    /// Case-insensitive: generators are inconsistent about "high" vs "HIGH".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(InvalidEnum {
                field: "RiskSeverity".into(),
                value: s.into(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for RiskSeverity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_is_clinical_rank() {
        assert!(RiskSeverity::Low < RiskSeverity::Medium);
        assert!(RiskSeverity::Medium < RiskSeverity::High);
        assert!(RiskSeverity::High < RiskSeverity::Critical);
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("high".parse::<RiskSeverity>().unwrap(), RiskSeverity::High);
        assert_eq!(" Critical ".parse::<RiskSeverity>().unwrap(), RiskSeverity::Critical);
        assert!("urgent".parse::<RiskSeverity>().is_err());
    }

    #[test]
    fn severity_serializes_uppercase() {
        let json = serde_json::to_string(&RiskSeverity::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        let back: RiskSeverity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, RiskSeverity::Medium);
    }

    #[test]
    fn score_map_matches_ranking() {
        assert_eq!(RiskSeverity::Low.score(), 25);
        assert_eq!(RiskSeverity::Medium.score(), 50);
        assert_eq!(RiskSeverity::High.score(), 75);
        assert_eq!(RiskSeverity::Critical.score(), 100);
    }
}
