use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A relative time phrase resolved to a wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalEvent {
    pub event: String,
    /// `HH:MM`, 24-hour.
    pub absolute_time: String,
    #[serde(default)]
    pub relative_original: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TemporalRecord {
    #[serde(default)]
    pub handoff_time: String,
    #[serde(default)]
    pub events: Vec<TemporalEvent>,
    /// Free text ("08:00 - Warfarin (next daily dose)"); dosing intervals
    /// vary per drug, so these are not machine times.
    #[serde(default)]
    pub next_dose_times: Vec<String>,
    #[serde(default)]
    pub calculated_times: BTreeMap<String, serde_json::Value>,
}
