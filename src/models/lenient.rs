//! Lenient scalar deserializers for generator output.
//!
//! Generators routinely emit `"45"` where a number is expected, or `90`
//! where a string is expected. These helpers accept both forms.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept a string or a number, returning it as a string.
pub fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Accept an integer, float or numeric string. Anything else becomes `None`.
pub fn opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(|f| {
            if f >= 0.0 && f <= u32::MAX as f64 {
                Some(f.round() as u32)
            } else {
                None
            }
        }),
        _ => None,
    })
}

/// Accept a number or numeric string as `f64`.
pub fn f64_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("expected number, got {s:?}"))),
        other => Err(serde::de::Error::custom(format!("expected number, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "string_or_number")]
        value: String,
        #[serde(default, deserialize_with = "opt_u32")]
        age: Option<u32>,
        #[serde(deserialize_with = "f64_or_string")]
        confidence: f64,
    }

    #[test]
    fn numbers_become_strings() {
        let p: Probe = serde_json::from_str(r#"{"value": 90, "confidence": 0.5}"#).unwrap();
        assert_eq!(p.value, "90");
        assert_eq!(p.age, None);
    }

    #[test]
    fn numeric_strings_become_numbers() {
        let p: Probe =
            serde_json::from_str(r#"{"value": "140/90", "age": "72", "confidence": "0.9"}"#)
                .unwrap();
        assert_eq!(p.age, Some(72));
        assert!((p.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_age_is_none() {
        let p: Probe =
            serde_json::from_str(r#"{"value": "x", "age": "seventy", "confidence": 1}"#).unwrap();
        assert_eq!(p.age, None);
    }

    #[test]
    fn non_numeric_confidence_is_rejected() {
        let r: Result<Probe, _> =
            serde_json::from_str(r#"{"value": "x", "confidence": "high"}"#);
        assert!(r.is_err());
    }
}
