//! Alias tables and shape fix-ups for each generator-produced record.
//!
//! Each field lists its accepted names, canonical name first. The first
//! listed name carrying a non-null value wins; every listed name is then
//! removed and the winner re-inserted under the canonical name. A field
//! whose names are all null or missing ends up absent, so its serde default
//! applies. Single-name entries exist only for that null-to-default effect.

use serde_json::{Map, Value};

use super::parser::StructuredRecord;
use crate::models::{ExtractedRecord, NarrativeRecord, OmissionRecord, RiskRecord, TemporalRecord};

/// Accepted names for one field, canonical first.
pub type FieldAliases = &'static [&'static str];

pub const SUMMARY_FIELDS: &[FieldAliases] = &[
    &["patient_name", "patient name", "name"],
    &["bed", "bed_number", "bed number"],
    &["age"],
    &["chief_complaint", "chief complaint", "complaint", "admission_reason"],
];

pub const EXTRACTED_FIELDS: &[FieldAliases] = &[
    &["medications"],
    &["vitals"],
    &["symptoms"],
    &["pending_tasks"],
];

pub const MEDICATION_FIELDS: &[FieldAliases] = &[
    &["dose", "dosage", "amount"],
    &["time_given", "time", "time given", "time_administered"],
];

pub const VITAL_FIELDS: &[FieldAliases] = &[
    &["type", "vital_type", "vital"],
    &["trend", "direction", "change"],
];

pub const SYMPTOM_FIELDS: &[FieldAliases] = &[&["severity"]];

pub const TEMPORAL_FIELDS: &[FieldAliases] = &[
    &["handoff_time"],
    &["events"],
    &["next_dose_times"],
    &["calculated_times"],
];

pub const TEMPORAL_EVENT_FIELDS: &[FieldAliases] = &[
    &["event", "type", "event_type", "description", "event_name"],
    &["absolute_time", "time", "absolute", "resolved_time"],
    &["relative_original", "relative", "original", "time_since", "original_text"],
];

pub const RISK_FIELDS: &[FieldAliases] = &[&["alerts"]];

pub const RISK_ALERT_FIELDS: &[FieldAliases] = &[
    &["alert_type", "type", "alert"],
    &["action_required", "action", "recommended_action"],
    &["confidence"],
];

pub const OMISSION_RECORD_FIELDS: &[FieldAliases] = &[
    &["omissions"],
    &["high_risk_conditions_mentioned"],
    &["missing_critical_items"],
];

pub const OMISSION_FIELDS: &[FieldAliases] = &[
    &["expected_in_handoff", "expected", "what_was_expected"],
];

pub const NARRATIVE_FIELDS: &[FieldAliases] = &[
    &["patient_overview"],
    &["medications"],
    &["risk_alerts"],
    &["missing_info"],
    &["action_items"],
];

/// Apply an alias table to one JSON object.
pub fn resolve_fields(object: &mut Map<String, Value>, table: &[FieldAliases]) {
    for names in table {
        let winner = names
            .iter()
            .find(|name| object.get(**name).is_some_and(|v| !v.is_null()))
            .and_then(|name| object.get(*name).cloned());

        for name in names.iter() {
            object.remove(*name);
        }

        if let (Some(value), Some(canonical)) = (winner, names.first()) {
            object.insert((*canonical).to_string(), value);
        }
    }
}

/// Apply an alias table to every object inside `object[key]` when it is an array.
fn resolve_items(object: &mut Map<String, Value>, key: &str, table: &[FieldAliases]) {
    if let Some(Value::Array(items)) = object.get_mut(key) {
        for item in items.iter_mut() {
            if let Value::Object(inner) = item {
                resolve_fields(inner, table);
            }
        }
    }
}

impl StructuredRecord for ExtractedRecord {
    /// Generators often return patient fields flat instead of under
    /// `summary`; move them into a nested object.
    fn normalize(object: &mut Map<String, Value>) {
        if matches!(object.get("summary"), Some(Value::Object(_))) {
            return;
        }
        object.remove("summary");

        let mut summary = Map::new();
        for name in SUMMARY_FIELDS.iter().flat_map(|names| names.iter()) {
            if let Some(value) = object.remove(*name) {
                summary.insert((*name).to_string(), value);
            }
        }
        object.insert("summary".into(), Value::Object(summary));
    }

    fn resolve_aliases(object: &mut Map<String, Value>) {
        resolve_fields(object, EXTRACTED_FIELDS);
        if let Some(Value::Object(summary)) = object.get_mut("summary") {
            resolve_fields(summary, SUMMARY_FIELDS);
        }
        resolve_items(object, "medications", MEDICATION_FIELDS);
        resolve_items(object, "vitals", VITAL_FIELDS);
        resolve_items(object, "symptoms", SYMPTOM_FIELDS);
    }

    fn finish(mut self) -> Self {
        self.summary.fill_blank_identity();
        self
    }
}

impl StructuredRecord for TemporalRecord {
    fn resolve_aliases(object: &mut Map<String, Value>) {
        resolve_fields(object, TEMPORAL_FIELDS);
        resolve_items(object, "events", TEMPORAL_EVENT_FIELDS);
    }
}

impl StructuredRecord for RiskRecord {
    /// Top-level severity and score are recomputed from the alerts later, so
    /// the generator's values are dropped rather than validated.
    fn normalize(object: &mut Map<String, Value>) {
        object.remove("overall_risk");
        object.remove("risk_score");
    }

    fn resolve_aliases(object: &mut Map<String, Value>) {
        resolve_fields(object, RISK_FIELDS);
        resolve_items(object, "alerts", RISK_ALERT_FIELDS);
    }
}

impl StructuredRecord for OmissionRecord {
    fn resolve_aliases(object: &mut Map<String, Value>) {
        resolve_fields(object, OMISSION_RECORD_FIELDS);
        resolve_items(object, "omissions", OMISSION_FIELDS);
    }
}

impl StructuredRecord for NarrativeRecord {
    fn resolve_aliases(object: &mut Map<String, Value>) {
        resolve_fields(object, NARRATIVE_FIELDS);
    }
}
