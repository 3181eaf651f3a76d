use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extracted::ExtractedRecord;
use super::narrative::NarrativeRecord;
use super::omission::OmissionRecord;
use super::risk::RiskRecord;
use super::temporal::TemporalRecord;

/// Complete output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub extracted: ExtractedRecord,
    pub temporal: TemporalRecord,
    pub risks: RiskRecord,
    pub omissions: OmissionRecord,
    pub handoff_summary: NarrativeRecord,
    pub processing_time_ms: u64,
}

impl AggregateResult {
    /// Nested document form for opaque storage. No field is flattened, so
    /// consumers can read single paths without deserializing the whole thing.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_document(document: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(document)
    }
}

/// Read a dotted path (`extracted.summary.chief_complaint`, `risks.alerts.0.reason`)
/// out of a stored document. Numeric segments index into arrays.
pub fn document_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(document, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medication, PatientSummary, RiskAlert, RiskSeverity};

    fn sample() -> AggregateResult {
        AggregateResult {
            extracted: ExtractedRecord {
                summary: PatientSummary {
                    patient_name: "Sharma ji".into(),
                    bed: "12".into(),
                    age: Some(68),
                    chief_complaint: Some("CHF exacerbation".into()),
                },
                medications: vec![Medication {
                    name: "Furosemide".into(),
                    dose: "40mg".into(),
                    time_given: "subah".into(),
                    reason: None,
                }],
                ..ExtractedRecord::default()
            },
            temporal: TemporalRecord::default(),
            risks: RiskRecord {
                alerts: vec![RiskAlert {
                    severity: RiskSeverity::High,
                    alert_type: "hypotension".into(),
                    reason: "BP dropped 140 to 90".into(),
                    action_required: "Recheck BP".into(),
                    confidence: 0.9,
                }],
                overall_risk: RiskSeverity::High,
                risk_score: 75,
            },
            omissions: OmissionRecord::default(),
            handoff_summary: NarrativeRecord::apology(),
            processing_time_ms: 1234,
        }
    }

    #[test]
    fn document_keeps_nesting() {
        let doc = sample().to_document().unwrap();
        assert!(doc["extracted"]["summary"].is_object());
        assert!(doc.get("chief_complaint").is_none());
        assert_eq!(doc["risks"]["overall_risk"], "HIGH");
    }

    #[test]
    fn path_reads_single_fields() {
        let doc = sample().to_document().unwrap();
        assert_eq!(
            document_path(&doc, "extracted.summary.chief_complaint").and_then(Value::as_str),
            Some("CHF exacerbation")
        );
        assert_eq!(
            document_path(&doc, "extracted.medications.0.name").and_then(Value::as_str),
            Some("Furosemide")
        );
        assert!(document_path(&doc, "extracted.medications").unwrap().is_array());
        assert!(document_path(&doc, "extracted.medications.7.name").is_none());
        assert!(document_path(&doc, "extracted.summary.chief_complaint.deeper").is_none());
    }

    #[test]
    fn document_round_trip_is_lossless() {
        let original = sample();
        let doc = original.to_document().unwrap();
        let back = AggregateResult::from_document(doc).unwrap();
        assert_eq!(back, original);
    }
}
