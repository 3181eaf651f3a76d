use super::{knowledge_or, pretty, StageEnv};
use crate::models::{ExtractedRecord, HandoffContext, OmissionRecord};
use crate::pipeline::rag::omission_query;
use crate::pipeline::structuring::{invoke_structured, StageError};

/// Marker sentence shown to the generator when retrieval finds nothing.
pub const NO_PROTOCOLS: &str =
    "No specific protocols retrieved. Use general nursing handoff standards.";

fn build_omission_system_prompt(rag_context: &str) -> String {
    format!(
        r#"You are a "What Was NOT Said" analyzer for nurse handoffs.
Detect CRITICAL MISSING INFORMATION by analyzing what SHOULD have been mentioned but wasn't.

RETRIEVED MONITORING STANDARDS:
{rag_context}

NEGATIVE REASONING — detect ABSENCE of expected care elements:
- For any drug: was monitoring/level/assessment mentioned?
- For any condition: were relevant vitals and assessment mentioned?
- For any symptom: was follow-up or reassessment mentioned?
- For any risk identified: were appropriate precautions documented?

Return ONLY valid JSON matching this EXACT schema:

{{
  "omissions": [
    {{
      "type": "short_category e.g. glucose_monitoring",
      "severity": "HIGH or MEDIUM or LOW",
      "reason": "Why this omission is clinically dangerous",
      "expected_in_handoff": "What specifically should have been said"
    }}
  ],
  "high_risk_conditions_mentioned": ["condition name"],
  "missing_critical_items": ["item description"]
}}

Rules:
- Use EXACTLY these field names
- omissions not missing, expected_in_handoff not expected
- If nothing critical is missing: return {{"omissions": [], "high_risk_conditions_mentioned": [], "missing_critical_items": []}}
- Output ONLY the JSON object, no explanation"#
    )
}

fn build_omission_prompt(transcript: &str, extracted: &ExtractedRecord, context: &str) -> String {
    format!(
        "Transcript: {transcript}\nExtracted Entities: {}\nPrevious Shift Context: {context}\n\nReturn ONLY the JSON:",
        pretty(extracted)
    )
}

async fn try_analyze_omissions(
    env: &StageEnv,
    transcript: &str,
    extracted: &ExtractedRecord,
    ctx: &HandoffContext,
) -> Result<OmissionRecord, StageError> {
    let query = omission_query(extracted);
    let rag_context = knowledge_or(env, "omissions", &query, NO_PROTOCOLS).await?;

    tracing::info!(
        stage = "omissions",
        knowledge = rag_context != NO_PROTOCOLS,
        has_context = ctx.patient_context.is_some(),
        "Analyzing omissions"
    );

    let request = env.structured.request(
        &build_omission_system_prompt(&rag_context),
        build_omission_prompt(
            transcript,
            extracted,
            ctx.patient_context.as_deref().unwrap_or_default(),
        ),
    );
    invoke_structured::<OmissionRecord>(env.llm.as_ref(), &request, &env.retry, "omissions").await
}

/// Find care elements the handoff should have mentioned but didn't.
///
/// Runs alongside risk detection, so it never sees the risk record.
pub async fn analyze_omissions(
    env: &StageEnv,
    transcript: &str,
    extracted: &ExtractedRecord,
    ctx: &HandoffContext,
) -> OmissionRecord {
    match try_analyze_omissions(env, transcript, extracted, ctx).await {
        Ok(record) => {
            tracing::info!(
                stage = "omissions",
                total = record.omissions.len(),
                high_severity = record.high_severity_count(),
                "Omission analysis complete"
            );
            record
        }
        Err(e) => {
            tracing::error!(stage = "omissions", error = %e, "Omission analysis failed, returning empty result");
            OmissionRecord::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskSeverity;
    use crate::pipeline::stages::test_support::{env, env_offline};
    use crate::pipeline::structuring::MockLlmClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn previous_shift_context_reaches_prompt() {
        let llm = Arc::new(MockLlmClient::new(r#"{"omissions": []}"#));
        let ctx = HandoffContext::new("07:00", Some("Night shift: RBS 320".into())).unwrap();
        analyze_omissions(&env(llm.clone()), "Insulin diya", &ExtractedRecord::default(), &ctx).await;
        let call = &llm.calls()[0];
        assert!(call.prompt.contains("Previous Shift Context: Night shift: RBS 320"));
        assert!(call.system.contains(NO_PROTOCOLS));
    }

    #[tokio::test]
    async fn parses_omissions() {
        let llm = Arc::new(MockLlmClient::new(
            r#"```json
{"omissions": [{"type": "glucose_monitoring", "severity": "HIGH", "reason": "on insulin", "expected": "last RBS value"}],
 "high_risk_conditions_mentioned": ["DKA"]}
```"#,
        ));
        let record = analyze_omissions(
            &env(llm),
            "Insulin diya",
            &ExtractedRecord::default(),
            &HandoffContext::default(),
        )
        .await;
        assert_eq!(record.omissions[0].severity, RiskSeverity::High);
        assert_eq!(record.omissions[0].expected_in_handoff, "last RBS value");
        assert_eq!(record.high_severity_count(), 1);
    }

    #[tokio::test]
    async fn failure_returns_empty_record() {
        let llm = Arc::new(MockLlmClient::unavailable());
        let record = analyze_omissions(
            &env(llm),
            "x",
            &ExtractedRecord::default(),
            &HandoffContext::default(),
        )
        .await;
        assert_eq!(record, OmissionRecord::default());
    }

    #[tokio::test]
    async fn retrieval_outage_returns_empty_record() {
        let llm = Arc::new(MockLlmClient::new(r#"{"omissions": [{"type": "x", "severity": "HIGH", "reason": "y"}]}"#));
        let record = analyze_omissions(
            &env_offline(llm.clone()),
            "Insulin diya",
            &ExtractedRecord::default(),
            &HandoffContext::default(),
        )
        .await;
        assert_eq!(record, OmissionRecord::default());
        assert_eq!(llm.call_count(), 0);
    }
}
