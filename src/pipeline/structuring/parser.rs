use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::StageError;

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Gemma-family thinking blocks: `<unused94>thought ... <unused95>`.
static GEMMA_THOUGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<unused94>thought.*?<unused95>").expect("valid regex"));

static UNUSED_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<unused\d+>").expect("valid regex"));

static ANSWER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?answer>").expect("valid regex"));

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?i:json)?\s*(.*?)\s*```").expect("valid regex"));

/// A record shape the extractor can recover from generator output.
///
/// Hooks run in order on the parsed JSON object: `normalize` (reshape),
/// `resolve_aliases` (canonical field names), serde deserialization, `finish`.
pub trait StructuredRecord: DeserializeOwned + Send {
    /// Reshape the raw object before alias resolution.
    fn normalize(_object: &mut Map<String, Value>) {}

    /// Rename synonymous fields to their canonical names.
    fn resolve_aliases(object: &mut Map<String, Value>);

    /// Fix-ups that need the typed value.
    fn finish(self) -> Self {
        self
    }
}

/// Strip everything around the JSON object a generator was asked to emit.
///
/// Order matters: reasoning blocks, answer tags, code fence, outer braces.
pub fn unwrap_generator_text(raw: &str) -> String {
    let text = THINK_BLOCK_RE.replace_all(raw, "");
    let text = GEMMA_THOUGHT_RE.replace_all(&text, "");
    let text = UNUSED_TOKEN_RE.replace_all(&text, "");
    let text = ANSWER_TAG_RE.replace_all(&text, "");
    let mut text = text.trim().to_string();

    if let Some(inner) = CODE_FENCE_RE.captures(&text).and_then(|c| c.get(1)) {
        text = inner.as_str().trim().to_string();
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            text = text[start..=end].to_string();
        }
    }

    text
}

/// Recover a validated `T` from raw generator text.
pub fn extract_structured<T: StructuredRecord>(raw: &str) -> Result<T, StageError> {
    let json_str = unwrap_generator_text(raw);
    if json_str.is_empty() {
        return Err(StageError::MalformedOutput("Empty generator output".into()));
    }

    let value: Value = serde_json::from_str(&json_str)
        .map_err(|e| StageError::MalformedOutput(format!("JSON parsing: {e}")))?;

    let mut object = match value {
        Value::Object(map) => map,
        other => {
            return Err(StageError::MalformedOutput(format!(
                "Expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    T::normalize(&mut object);
    T::resolve_aliases(&mut object);

    serde_json::from_value::<T>(Value::Object(object))
        .map(T::finish)
        .map_err(|e| StageError::MalformedOutput(format!("Validation: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedRecord, RiskRecord, RiskSeverity};

    const CLEAN: &str = r#"{"summary": {"patient_name": "Ramesh", "bed": "4", "age": 61, "chief_complaint": "chest pain"}, "medications": [{"name": "Aspirin", "dose": "75mg", "time_given": "subah", "reason": null}], "vitals": [], "symptoms": [], "pending_tasks": ["ECG repeat"]}"#;

    fn clean_record() -> ExtractedRecord {
        extract_structured(CLEAN).unwrap()
    }

    #[test]
    fn clean_json_parses() {
        let record = clean_record();
        assert_eq!(record.summary.patient_name, "Ramesh");
        assert_eq!(record.medications[0].dose, "75mg");
        assert_eq!(record.pending_tasks, vec!["ECG repeat"]);
    }

    #[test]
    fn every_wrapper_combination_yields_the_clean_record() {
        let expected = clean_record();
        let wrappers: Vec<String> = vec![
            format!("<think>Patient is Ramesh... {{\"draft\": 1}}</think>{CLEAN}"),
            format!("<Answer>{CLEAN}</Answer>"),
            format!("<answer>\n{CLEAN}\n</answer>"),
            format!("```json\n{CLEAN}\n```"),
            format!("```\n{CLEAN}\n```"),
            format!("Here is the JSON you asked for:\n{CLEAN}\nLet me know if you need more."),
            format!(
                "<think>\nreasoning {{ nested }}\n</think>\n<Answer>\nSure!\n```json\n{CLEAN}\n```\nDone.\n</Answer>"
            ),
            format!("<unused94>thought\nthinking {{x}}<unused95>{CLEAN}"),
        ];
        for wrapped in wrappers {
            let record: ExtractedRecord = extract_structured(&wrapped)
                .unwrap_or_else(|e| panic!("failed on {wrapped:?}: {e}"));
            assert_eq!(record, expected, "mismatch for {wrapped:?}");
        }
    }

    #[test]
    fn unwrap_is_idempotent() {
        let wrapped = format!("<think>x</think>```json\n{CLEAN}\n```");
        let once = unwrap_generator_text(&wrapped);
        assert_eq!(unwrap_generator_text(&once), once);
    }

    #[test]
    fn garbage_is_malformed_output() {
        let result: Result<ExtractedRecord, _> = extract_structured("I cannot help with that.");
        assert!(matches!(result, Err(StageError::MalformedOutput(_))));
    }

    #[test]
    fn empty_output_is_malformed() {
        let result: Result<RiskRecord, _> = extract_structured("  <think>only thoughts</think> ");
        assert!(matches!(result, Err(StageError::MalformedOutput(_))));
    }

    #[test]
    fn top_level_array_is_malformed() {
        let result: Result<RiskRecord, _> = extract_structured("[1, 2, 3]");
        assert!(matches!(result, Err(StageError::MalformedOutput(_))));
    }

    #[test]
    fn invalid_severity_is_malformed() {
        let raw = r#"{"alerts": [{"severity": "SEVERE", "alert_type": "x", "reason": "y"}]}"#;
        let result: Result<RiskRecord, _> = extract_structured(raw);
        assert!(matches!(result, Err(StageError::MalformedOutput(_))));
    }

    #[test]
    fn lowercase_severity_is_accepted() {
        let raw = r#"{"alerts": [{"severity": "high", "type": "bleeding", "reason": "INR 4.2"}]}"#;
        let record: RiskRecord = extract_structured(raw).unwrap();
        assert_eq!(record.alerts[0].severity, RiskSeverity::High);
        assert_eq!(record.alerts[0].alert_type, "bleeding");
    }
}
