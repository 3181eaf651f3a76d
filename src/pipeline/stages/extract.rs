use super::StageEnv;
use crate::models::ExtractedRecord;
use crate::pipeline::structuring::invoke_structured;

pub const EXTRACT_SYSTEM_PROMPT: &str = r#"You are a clinical entity extraction system for nurse handoffs.
Extract structured information and return ONLY valid JSON matching this EXACT schema:

{
  "summary": {
    "patient_name": "string",
    "bed": "string",
    "age": null,
    "chief_complaint": "string or null"
  },
  "medications": [
    {
      "name": "string",
      "dose": "string",
      "time_given": "exact phrase from transcript e.g. subah, 4 hours ago, or unknown",
      "reason": "string or null"
    }
  ],
  "vitals": [
    {
      "type": "BP or HR or Temp or SpO2 or RR",
      "value": "current value as string e.g. 90 or 140/90",
      "systolic": null,
      "diastolic": null,
      "trend": "stable or rising or dropping or unknown"
    }
  ],
  "symptoms": [
    {
      "description": "string",
      "severity": "mild or moderate or severe"
    }
  ],
  "pending_tasks": ["string"]
}

Rules:
- Use EXACTLY these field names — do not rename them
- summary must always be a nested object, never flat fields
- time_given: preserve the original Hindi/English phrase from transcript

BP PARSING RULES (critical):
- "140 se 90 ho gaya" = BP DROPPED from 140 to 90 → value="90", systolic=90, trend="dropping"
- "BP 140/90" = static reading → value="140/90", systolic=140, diastolic=90, trend="unknown"
- "BP badh gaya" = BP rising → trend="rising"
- "BP stable hai" → trend="stable"
- "X se Y ho gaya" always means it CHANGED from X to Y — the current value is Y

TREND DETECTION:
- "se ... ho gaya" (went from X to Y) = explicit change, detect direction
- If value went up → "rising", if went down → "dropping"
- Only use "unknown" if no directional info

- Return [] for any empty list, null for missing optional fields
- Output ONLY the JSON object, no explanation, no markdown"#;

fn build_extract_prompt(transcript: &str) -> String {
    format!("Handoff Transcript:\n{transcript}\n\nReturn ONLY the JSON:")
}

/// Pull patient identity, medications, vitals, symptoms and pending tasks
/// out of the transcript.
pub async fn extract_entities(env: &StageEnv, transcript: &str) -> ExtractedRecord {
    tracing::info!(
        stage = "extract",
        transcript_len = transcript.len(),
        "Extracting clinical entities"
    );

    let request = env
        .structured
        .request(EXTRACT_SYSTEM_PROMPT, build_extract_prompt(transcript));

    match invoke_structured::<ExtractedRecord>(env.llm.as_ref(), &request, &env.retry, "extract")
        .await
    {
        Ok(record) => {
            tracing::info!(
                stage = "extract",
                meds = record.medications.len(),
                vitals = record.vitals.len(),
                symptoms = record.symptoms.len(),
                tasks = record.pending_tasks.len(),
                "Extraction complete"
            );
            record
        }
        Err(e) => {
            tracing::error!(stage = "extract", error = %e, "Extraction failed, using fallback");
            ExtractedRecord::unknown_patient()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::test_support::env;
    use crate::pipeline::structuring::MockLlmClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn parses_generator_output() {
        let llm = Arc::new(MockLlmClient::new(
            r#"<think>BP went down</think>{"summary": {"patient_name": "Ramesh", "bed": "12"},
               "vitals": [{"type": "BP", "value": "90", "systolic": 90, "trend": "dropping"}]}"#,
        ));
        let record = extract_entities(&env(llm.clone()), "Bed 12 Ramesh, BP 140 se 90 ho gaya").await;
        assert_eq!(record.summary.patient_name, "Ramesh");
        assert_eq!(record.vitals[0].trend, "dropping");
        assert_eq!(llm.call_count(), 1);

        let call = &llm.calls()[0];
        assert!(call.prompt.contains("BP 140 se 90 ho gaya"));
        assert_eq!(call.system, EXTRACT_SYSTEM_PROMPT);
        assert_eq!(call.temperature, 0.0);
    }

    #[tokio::test]
    async fn falls_back_after_retries() {
        let llm = Arc::new(MockLlmClient::new("no json here"));
        let record = extract_entities(&env(llm.clone()), "kuch bhi").await;
        assert_eq!(record, ExtractedRecord::unknown_patient());
        assert_eq!(record.summary.bed, "Not stated");
        assert_eq!(llm.call_count(), 3);
    }

    #[test]
    fn system_prompt_keeps_bp_rules() {
        assert!(EXTRACT_SYSTEM_PROMPT.contains("140 se 90 ho gaya"));
        assert!(EXTRACT_SYSTEM_PROMPT.contains("TREND DETECTION"));
        assert!(EXTRACT_SYSTEM_PROMPT.contains(
            "- \"X se Y ho gaya\" always means it CHANGED from X to Y — the current value is Y\n"
        ));
        assert!(EXTRACT_SYSTEM_PROMPT.contains("- Use EXACTLY these field names — do not rename them\n"));
    }
}
