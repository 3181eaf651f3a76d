//! Previous-shift context built from stored aggregate documents.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::models::document_path;

pub const NO_HISTORY: &str = "No previous handoff data.";

/// Alert types listed per shift.
const MAX_ALERTS_PER_SHIFT: usize = 3;

/// One stored handoff: when it happened and its aggregate document
/// (as produced by [`AggregateResult::to_document`](crate::models::AggregateResult::to_document)).
#[derive(Debug, Clone, PartialEq)]
pub struct PriorShift {
    pub shift_time: Option<NaiveDateTime>,
    pub document: Value,
}

fn text_at<'a>(document: &'a Value, path: &str) -> Option<&'a str> {
    document_path(document, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Non-empty `field` strings of each object in the array at `path`.
fn field_of_each<'a>(document: &'a Value, path: &str, field: &str) -> Vec<&'a str> {
    document_path(document, path)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn describe_shift(shift: &PriorShift) -> String {
    let doc = &shift.document;
    let when = shift
        .shift_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".into());
    let complaint = text_at(doc, "extracted.summary.chief_complaint").unwrap_or("unknown complaint");
    let risk = text_at(doc, "risks.overall_risk").unwrap_or("UNKNOWN");

    let medications = field_of_each(doc, "extracted.medications", "name");
    let pending: Vec<&str> = document_path(doc, "extracted.pending_tasks")
        .and_then(Value::as_array)
        .map(|tasks| tasks.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let alerts: Vec<&str> = document_path(doc, "risks.alerts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(MAX_ALERTS_PER_SHIFT)
                .filter_map(|a| a.get("alert_type").and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut lines = vec![format!("[Shift {when}] Complaint: {complaint} | Risk: {risk}")];
    if !medications.is_empty() {
        lines.push(format!("  Medications on that shift: {}", medications.join(", ")));
    }
    if !pending.is_empty() {
        lines.push(format!("  Pending tasks carried forward: {}", pending.join("; ")));
    }
    if !alerts.is_empty() {
        lines.push(format!("  Alerts flagged: {}", alerts.join(", ")));
    }
    lines.join("\n")
}

/// Summarize up to `limit` prior shifts, newest first, for the
/// `patient_context` of the next run.
pub fn build_patient_context(shifts: &[PriorShift], limit: usize) -> String {
    let mut recent: Vec<&PriorShift> = shifts.iter().filter(|s| !s.document.is_null()).collect();
    // Newest first; undated shifts last.
    recent.sort_by(|a, b| b.shift_time.cmp(&a.shift_time));
    recent.truncate(limit);

    if recent.is_empty() {
        return NO_HISTORY.to_string();
    }

    let context = recent
        .into_iter()
        .map(describe_shift)
        .collect::<Vec<_>>()
        .join("\n\n");
    tracing::debug!(shifts = shifts.len(), chars = context.len(), "Patient context built");
    context
}
