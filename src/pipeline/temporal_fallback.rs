//! Regex and keyword time resolution used when the temporal stage's
//! generator output cannot be trusted.

use std::sync::LazyLock;

use chrono::{Duration, NaiveTime};
use regex::{Captures, Regex};

use crate::models::{TemporalEvent, TemporalRecord};

static BAJE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*baje").expect("valid regex"));

static MERIDIEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*(am|pm)\b").expect("valid regex"));

static OCLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*o'?clock").expect("valid regex"));

static HOURS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*hours?\s*ago").expect("valid regex"));

/// Hindi and English time-of-day words, in scan order.
const TIME_WORDS: &[(&str, &str)] = &[
    ("subah", "08:00"),
    ("savere", "07:00"),
    ("dopahar", "14:00"),
    ("sham", "18:00"),
    ("shaam", "18:00"),
    ("raat", "22:00"),
    ("midnight", "00:00"),
    ("morning", "08:00"),
    ("afternoon", "14:00"),
    ("evening", "18:00"),
    ("night", "22:00"),
];

static TIME_WORD_RES: LazyLock<Vec<(&'static str, &'static str, Regex)>> = LazyLock::new(|| {
    TIME_WORDS
        .iter()
        .map(|(word, time)| {
            let re = Regex::new(&format!(r"(?i)\b{word}\b")).expect("valid regex");
            (*word, *time, re)
        })
        .collect()
});

/// `HH:00` for a wall-clock hour; `None` when the number cannot be one.
fn clock(hour: u64) -> Option<String> {
    (hour <= 23).then(|| format!("{hour:02}:00"))
}

fn hour_of(caps: &Captures) -> Option<u64> {
    caps.get(1)?.as_str().parse().ok()
}

/// 12-hour clock only: `1..=12` followed by am or pm.
fn meridiem_time(caps: &Captures) -> Option<String> {
    let hour = hour_of(caps).filter(|h| (1..=12).contains(h))?;
    let pm = caps.get(2)?.as_str().eq_ignore_ascii_case("pm");
    clock(hour % 12 + if pm { 12 } else { 0 })
}

fn hours_before(handoff_time: &str, hours: u64) -> String {
    match NaiveTime::parse_from_str(handoff_time, "%H:%M") {
        Ok(base) => {
            // Reduce first so the duration can never overflow.
            let (time, _) = base.overflowing_sub_signed(Duration::hours((hours % 24) as i64));
            time.format("%H:%M").to_string()
        }
        Err(_) => handoff_time.to_string(),
    }
}

/// Resolve time phrases in `transcript` without the generator.
///
/// Pure: the same inputs always give the same record.
pub fn fallback_temporal(transcript: &str, handoff_time: &str) -> TemporalRecord {
    let patterns: [(&Regex, &dyn Fn(&Captures) -> Option<String>); 4] = [
        (&*BAJE_RE, &|c| hour_of(c).and_then(clock)),
        (&*MERIDIEM_RE, &meridiem_time),
        (&*OCLOCK_RE, &|c| hour_of(c).and_then(clock)),
        (&*HOURS_AGO_RE, &|c| {
            hour_of(c).map(|h| hours_before(handoff_time, h))
        }),
    ];

    let mut events = Vec::new();

    for (re, resolve) in patterns {
        for caps in re.captures_iter(transcript) {
            let Some(absolute_time) = resolve(&caps) else {
                continue;
            };
            let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            events.push(TemporalEvent {
                event: format!("Time reference: {matched}"),
                absolute_time,
                relative_original: matched.to_string(),
            });
        }
    }

    for (word, time, re) in TIME_WORD_RES.iter() {
        if re.is_match(transcript) {
            events.push(TemporalEvent {
                event: format!("Time period: {word}"),
                absolute_time: (*time).to_string(),
                relative_original: (*word).to_string(),
            });
        }
    }

    TemporalRecord {
        handoff_time: handoff_time.to_string(),
        events,
        ..TemporalRecord::default()
    }
}
