use super::{pretty, StageEnv};
use crate::models::{ExtractedRecord, NarrativeRecord, OmissionRecord, RiskRecord, TemporalRecord};
use crate::pipeline::structuring::invoke_structured;

pub const SUMMARY_SYSTEM_PROMPT: &str = r#"Tu ek senior Indian nurse hai jo incoming nurse ko shift handoff deta/deti hai.
Neeche diya gaya structured clinical data le aur ek concise Hinglish handoff summary banao.

Hinglish guidelines:
- Hindi sentence structure + clinical terms English mein (BP, HR, RR, SpO2, IV, ECG, labs).
- Tone: calm, direct, professional.

Return a VALID JSON object with EXACTLY these keys. No markdown, no extra text — just the JSON.

{
  "patient_overview": "<1-2 lines: patient name, bed, diagnosis, current status>",
  "medications": [
    "<Medication name, dose (agar pata ho), time given / next due. Unknown ho to 'Not stated'>"
  ],
  "risk_alerts": [
    "<[SEVERITY] Alert type: reason — immediate action required>"
  ],
  "missing_info": [
    "<Kya missing hai aur kyun critical hai — 1 line>"
  ],
  "action_items": [
    "<Specific nursing step — Confirm/Check/Monitor/Notify verb se shuru karo>"
  ]
}

Rules:
- risk_alerts empty array agar koi risk nahi.
- medications empty array agar koi medication nahi.
- missing_info max 5 items; low-value items skip karo.
- action_items 3-7 items.
- No emojis anywhere in the output.
- Inferred info: "(Inferred)" mark karo."#;

fn build_summary_prompt(
    extracted: &ExtractedRecord,
    temporal: &TemporalRecord,
    risks: &RiskRecord,
    omissions: &OmissionRecord,
) -> String {
    format!(
        "Patient Data:\n{}\n\nTemporal Info:\n{}\n\nRisk Analysis:\n{}\n\nOmission Analysis:\n{}\n\nNow return the JSON object:",
        pretty(extracted),
        pretty(temporal),
        pretty(risks),
        pretty(omissions)
    )
}

/// Write the display-ready Hinglish handoff summary from all prior records.
pub async fn summarize_handoff(
    env: &StageEnv,
    extracted: &ExtractedRecord,
    temporal: &TemporalRecord,
    risks: &RiskRecord,
    omissions: &OmissionRecord,
) -> NarrativeRecord {
    tracing::info!(
        stage = "summarize",
        alerts = risks.alerts.len(),
        omissions = omissions.omissions.len(),
        "Generating handoff summary"
    );

    let request = env.narrative.request(
        SUMMARY_SYSTEM_PROMPT,
        build_summary_prompt(extracted, temporal, risks, omissions),
    );

    match invoke_structured::<NarrativeRecord>(env.llm.as_ref(), &request, &env.retry, "summarize")
        .await
    {
        Ok(record) => {
            tracing::info!(
                stage = "summarize",
                medications = record.medications.len(),
                risk_alerts = record.risk_alerts.len(),
                action_items = record.action_items.len(),
                "Summary built"
            );
            record
        }
        Err(e) => {
            tracing::error!(stage = "summarize", error = %e, "Summary generation failed");
            NarrativeRecord::apology()
        }
    }
}
