use serde::{Deserialize, Serialize};

use super::enums::RiskSeverity;

/// Something a complete handoff should have said but didn't.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Omission {
    /// Short category, e.g. `glucose_monitoring`.
    #[serde(rename = "type")]
    pub category: String,
    pub severity: RiskSeverity,
    pub reason: String,
    #[serde(default)]
    pub expected_in_handoff: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OmissionRecord {
    #[serde(default)]
    pub omissions: Vec<Omission>,
    #[serde(default)]
    pub high_risk_conditions_mentioned: Vec<String>,
    #[serde(default)]
    pub missing_critical_items: Vec<String>,
}

impl OmissionRecord {
    pub fn high_severity_count(&self) -> usize {
        self.omissions
            .iter()
            .filter(|o| o.severity >= RiskSeverity::High)
            .count()
    }
}
