use serde::{Deserialize, Deserializer, Serialize};

use super::enums::RiskSeverity;
use super::lenient;

fn default_action() -> String {
    "Monitor closely.".into()
}

fn default_confidence() -> f64 {
    0.8
}

/// Confidence is a probability. A percentage or negative value means the
/// generator misread the schema, so the record is rejected and retried.
fn unit_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = lenient::f64_or_string(deserializer)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!(
            "confidence must be between 0 and 1, got {value}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub severity: RiskSeverity,
    pub alert_type: String,
    pub reason: String,
    #[serde(default = "default_action")]
    pub action_required: String,
    /// 0.0 to 1.0 inclusive.
    #[serde(default = "default_confidence", deserialize_with = "unit_confidence")]
    pub confidence: f64,
}

/// Dangerous patterns found in a handoff.
///
/// `overall_risk` and `risk_score` are derived from `alerts`; whatever the
/// generator put there is advisory and gets overwritten by
/// [`RiskRecord::recompute_overall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RiskRecord {
    #[serde(default)]
    pub alerts: Vec<RiskAlert>,
    #[serde(default)]
    pub overall_risk: RiskSeverity,
    #[serde(default)]
    pub risk_score: u32,
}

impl RiskRecord {
    /// Safe value used when risk assessment cannot be trusted.
    ///
    /// NOTE: this reads as "no risk", which is not the same as "risk not
    /// assessed". Kept for compatibility; flagged for product review.
    pub fn not_assessed() -> Self {
        Self::default()
    }

    pub fn recompute_overall(&mut self) {
        let (severity, score) = compute_overall_risk(&self.alerts);
        self.overall_risk = severity;
        self.risk_score = score;
    }
}

/// Highest alert severity and its score. No alerts → (LOW, 0).
pub fn compute_overall_risk(alerts: &[RiskAlert]) -> (RiskSeverity, u32) {
    alerts
        .iter()
        .map(|a| a.severity)
        .max()
        .map(|highest| (highest, highest.score()))
        .unwrap_or((RiskSeverity::Low, 0))
}
