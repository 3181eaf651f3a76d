use serde::{Deserialize, Serialize};

use super::lenient;

pub const UNKNOWN_PATIENT: &str = "Unknown";
pub const BED_NOT_STATED: &str = "Not stated";
pub const DOSE_NOT_SPECIFIED: &str = "not specified";
pub const TIME_UNKNOWN: &str = "unknown";
pub const TREND_UNKNOWN: &str = "unknown";
pub const SEVERITY_MILD: &str = "mild";

fn default_patient_name() -> String {
    UNKNOWN_PATIENT.into()
}

fn default_bed() -> String {
    BED_NOT_STATED.into()
}

fn default_dose() -> String {
    DOSE_NOT_SPECIFIED.into()
}

fn default_time_given() -> String {
    TIME_UNKNOWN.into()
}

fn default_trend() -> String {
    TREND_UNKNOWN.into()
}

fn default_symptom_severity() -> String {
    SEVERITY_MILD.into()
}

/// Patient identity block. Always nested under `summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    #[serde(default = "default_patient_name")]
    pub patient_name: String,
    #[serde(default = "default_bed")]
    pub bed: String,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub age: Option<u32>,
    #[serde(default)]
    pub chief_complaint: Option<String>,
}

impl PatientSummary {
    /// Blank identity strings are treated as "not mentioned".
    pub(crate) fn fill_blank_identity(&mut self) {
        if self.patient_name.trim().is_empty() {
            self.patient_name = default_patient_name();
        }
        if self.bed.trim().is_empty() {
            self.bed = default_bed();
        }
    }
}

impl Default for PatientSummary {
    fn default() -> Self {
        Self {
            patient_name: default_patient_name(),
            bed: default_bed(),
            age: None,
            chief_complaint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    #[serde(default = "default_dose")]
    pub dose: String,
    /// Original phrase from the transcript ("subah", "4 hours ago").
    #[serde(default = "default_time_given")]
    pub time_given: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vital {
    /// BP, HR, Temp, SpO2 or RR.
    #[serde(rename = "type")]
    pub vital_type: String,
    /// Current value; for a change "X se Y" this is Y.
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub systolic: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub diastolic: Option<u32>,
    /// stable, rising, dropping or unknown.
    #[serde(default = "default_trend")]
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    pub description: String,
    #[serde(default = "default_symptom_severity")]
    pub severity: String,
}

/// Clinical entities pulled out of a handoff transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractedRecord {
    pub summary: PatientSummary,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub vitals: Vec<Vital>,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
}

impl ExtractedRecord {
    /// Safe value used when extraction cannot be trusted.
    pub fn unknown_patient() -> Self {
        Self::default()
    }

    pub fn medication_names(&self) -> impl Iterator<Item = &str> {
        self.medications.iter().map(|m| m.name.as_str())
    }

    pub fn chief_complaint(&self) -> Option<&str> {
        self.summary.chief_complaint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_patient_has_documented_defaults() {
        let record = ExtractedRecord::unknown_patient();
        assert_eq!(record.summary.patient_name, "Unknown");
        assert_eq!(record.summary.bed, "Not stated");
        assert!(record.medications.is_empty());
        assert!(record.vitals.is_empty());
        assert!(record.symptoms.is_empty());
        assert!(record.pending_tasks.is_empty());
    }

    #[test]
    fn medication_defaults_apply_when_absent() {
        let med: Medication = serde_json::from_str(r#"{"name": "Warfarin"}"#).unwrap();
        assert_eq!(med.dose, "not specified");
        assert_eq!(med.time_given, "unknown");
        assert!(med.reason.is_none());
    }

    #[test]
    fn vital_type_serializes_as_type() {
        let vital: Vital = serde_json::from_str(r#"{"type": "BP", "value": 90}"#).unwrap();
        assert_eq!(vital.vital_type, "BP");
        assert_eq!(vital.value, "90");
        assert_eq!(vital.trend, "unknown");
        let json = serde_json::to_value(&vital).unwrap();
        assert_eq!(json["type"], "BP");
    }

    #[test]
    fn blank_identity_is_replaced() {
        let mut summary = PatientSummary {
            patient_name: "  ".into(),
            bed: String::new(),
            age: None,
            chief_complaint: None,
        };
        summary.fill_blank_identity();
        assert_eq!(summary, PatientSummary::default());
    }
}
