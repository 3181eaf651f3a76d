use super::{pretty, StageEnv};
use crate::models::{ExtractedRecord, HandoffContext, TemporalRecord};
use crate::pipeline::structuring::invoke_structured;
use crate::pipeline::temporal_fallback::fallback_temporal;

fn build_temporal_system_prompt(handoff_time: &str) -> String {
    format!(
        r#"You are a temporal reasoning engine for healthcare handoffs.
Convert all relative time references to absolute timestamps.

Handoff happening at: {handoff_time}

Time conversion rules:
- "4 hours ago" → subtract 4 hours from handoff_time
- "subah" / "morning" → 08:00
- "raat" / "night" → 22:00
- "sham" / "evening" → 20:00
- "dopahar" / "afternoon" → 14:00
- "4 baje" → 04:00

Next dose calculation (standard frequencies):
- Warfarin → once daily (24h after last dose)
- Insulin (regular/short-acting) → every 4-6h
- Insulin (long-acting e.g. glargine) → every 24h
- IV antibiotics (Vancomycin, Pip-Tazo) → every 6-8h
- Oral antibiotics → every 8-12h
- Furosemide (Lasix) → every 12-24h
- Digoxin → every 24h
- Antihypertensives → every 12-24h

Return ONLY valid JSON matching this EXACT schema:

{{
  "handoff_time": "HH:MM (24-hour)",
  "events": [
    {{
      "event": "description of what happened",
      "absolute_time": "HH:MM",
      "relative_original": "exact phrase from transcript"
    }}
  ],
  "next_dose_times": ["HH:MM - medication name e.g. 08:00 - Warfarin (next daily dose)"],
  "calculated_times": {{}}
}}

Rules:
- Use EXACTLY these field names — event not type, absolute_time not time
- Always populate next_dose_times if any medication was given
- Output ONLY the JSON object, no explanation"#
    )
}

fn build_temporal_prompt(transcript: &str, extracted: &ExtractedRecord, handoff_time: &str) -> String {
    format!(
        "Transcript: {transcript}\nExtracted Entities: {}\nHandoff Time: {handoff_time}\n\nReturn ONLY the JSON:",
        pretty(extracted)
    )
}

/// Resolve relative time phrases against the handoff time.
///
/// Falls back to [`fallback_temporal`] when the generator cannot be trusted.
pub async fn resolve_temporal(
    env: &StageEnv,
    transcript: &str,
    extracted: &ExtractedRecord,
    ctx: &HandoffContext,
) -> TemporalRecord {
    let handoff_time = ctx.handoff_time.as_str();
    tracing::info!(stage = "temporal", handoff_time, "Resolving temporal references");

    let request = env.structured.request(
        &build_temporal_system_prompt(handoff_time),
        build_temporal_prompt(transcript, extracted, handoff_time),
    );

    match invoke_structured::<TemporalRecord>(env.llm.as_ref(), &request, &env.retry, "temporal")
        .await
    {
        Ok(mut record) => {
            if record.handoff_time.trim().is_empty() {
                record.handoff_time = handoff_time.to_string();
            }
            tracing::info!(
                stage = "temporal",
                events = record.events.len(),
                next_doses = record.next_dose_times.len(),
                "Temporal resolution complete"
            );
            record
        }
        Err(e) => {
            tracing::error!(stage = "temporal", error = %e, "Temporal generation failed, using regex fallback");
            let record = fallback_temporal(transcript, handoff_time);
            tracing::warn!(
                stage = "temporal",
                events = record.events.len(),
                "Regex fallback used for temporal parsing"
            );
            record
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::test_support::env;
    use crate::pipeline::structuring::MockLlmClient;
    use std::sync::Arc;

    fn ctx(time: &str) -> HandoffContext {
        HandoffContext::new(time, None).unwrap()
    }

    #[tokio::test]
    async fn missing_handoff_time_is_filled_from_context() {
        let llm = Arc::new(MockLlmClient::new(
            r#"{"events": [{"event": "Insulin", "absolute_time": "03:00", "relative_original": "4 hours ago"}],
                "next_dose_times": ["09:00 - Insulin"]}"#,
        ));
        let record = resolve_temporal(
            &env(llm.clone()),
            "Insulin 4 hours ago",
            &ExtractedRecord::default(),
            &ctx("7:00 AM"),
        )
        .await;
        assert_eq!(record.handoff_time, "07:00");
        assert_eq!(record.next_dose_times, vec!["09:00 - Insulin"]);
        assert!(llm.calls()[0].system.contains("Handoff happening at: 07:00"));
    }

    #[tokio::test]
    async fn garbage_uses_deterministic_fallback() {
        let llm = Arc::new(MockLlmClient::new("I think the insulin was given early"));
        let transcript = "Insulin 4 hours ago diya, subah BP check";
        let record =
            resolve_temporal(&env(llm), transcript, &ExtractedRecord::default(), &ctx("07:00"))
                .await;
        assert_eq!(record, fallback_temporal(transcript, "07:00"));
        assert_eq!(record.events[0].absolute_time, "03:00");
    }

    #[test]
    fn system_prompt_embeds_handoff_time_and_schema_braces() {
        let prompt = build_temporal_system_prompt("19:30");
        assert!(prompt.contains("Handoff happening at: 19:30"));
        assert!(prompt.contains(r#""calculated_times": {}"#));
    }
}
