use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handoff time used when the caller does not supply one.
pub const DEFAULT_HANDOFF_TIME: &str = "07:00 AM";

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unrecognised handoff time: {0:?}")]
pub struct InvalidHandoffTime(pub String);

/// Per-run configuration handed to every stage. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffContext {
    /// `HH:MM`, 24-hour.
    pub handoff_time: String,
    /// Summary of previous shifts, if any.
    pub patient_context: Option<String>,
}

impl HandoffContext {
    pub fn new(
        handoff_time: &str,
        patient_context: Option<String>,
    ) -> Result<Self, InvalidHandoffTime> {
        Ok(Self {
            handoff_time: normalize_handoff_time(handoff_time)?,
            patient_context: patient_context.filter(|c| !c.trim().is_empty()),
        })
    }
}

impl Default for HandoffContext {
    fn default() -> Self {
        Self {
            handoff_time: "07:00".into(),
            patient_context: None,
        }
    }
}

/// Normalise a wall-clock string to `HH:MM` 24-hour form.
///
/// Accepts `07:00`, `7:00 AM`, `7:30pm`, `0700`, `7`.
pub fn normalize_handoff_time(raw: &str) -> Result<String, InvalidHandoffTime> {
    let invalid = || InvalidHandoffTime(raw.to_string());

    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_ascii_lowercase();

    let (clock, meridiem) = if let Some(rest) = compact.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour, minute): (u32, u32) = match clock.split_once(':') {
        Some((h, m)) => (
            h.parse().map_err(|_| invalid())?,
            m.parse().map_err(|_| invalid())?,
        ),
        None if !clock.is_empty() && clock.chars().all(|c| c.is_ascii_digit()) => {
            match clock.len() {
                1 | 2 => (clock.parse().map_err(|_| invalid())?, 0),
                3 | 4 => {
                    let split = clock.len() - 2;
                    (
                        clock[..split].parse().map_err(|_| invalid())?,
                        clock[split..].parse().map_err(|_| invalid())?,
                    )
                }
                _ => return Err(invalid()),
            }
        }
        None => return Err(invalid()),
    };

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return Err(invalid());
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
        .map(|t| t.format("%H:%M").to_string())
        .ok_or_else(invalid)
}
