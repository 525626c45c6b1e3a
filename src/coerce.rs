use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};

/// Coerce a raw text field to `f64`, falling back to `0.0`.
///
/// Non-finite values (`NaN`, `inf`) are treated as missing.
pub fn coerce_f64(s: &str) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(val) if val.is_finite() => val,
        _ => 0.0,
    }
}

/// Read a yes/no form field. "SI", "yes", "true" and "1" mean yes;
/// anything else means no.
pub fn coerce_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "si" | "sì" | "yes" | "y" | "true" | "1"
    )
}

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn coerce_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse a wall-clock time as `HH:MM`, also accepting `HH:MM:SS`.
pub fn coerce_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Any scalar a form field may hold once serialized.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null(()),
}

/// Deserializer for numeric fields that accepts numbers or text.
///
/// Accepts:
/// - `volume_final: 30.5` (number)
/// - `volume_final: "30.5"` (string that parses to a number)
/// - `volume_final: "n/a"` or `~` (coerced to `0.0`)
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawValue::deserialize(deserializer)? {
        RawValue::Number(n) if n.is_finite() => n,
        RawValue::Number(_) => 0.0,
        RawValue::Bool(b) => f64::from(u8::from(b)),
        RawValue::Text(s) => coerce_f64(&s),
        RawValue::Null(()) => 0.0,
    })
}

/// Deserializer for free-text fields; numbers are kept in their text form.
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawValue::deserialize(deserializer)? {
        RawValue::Number(n) => n.to_string(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Text(s) => s,
        RawValue::Null(()) => String::new(),
    })
}

/// Deserializer for yes/no fields that accepts booleans, numbers or text.
pub fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawValue::deserialize(deserializer)? {
        RawValue::Bool(b) => b,
        RawValue::Number(n) => n == 1.0,
        RawValue::Text(s) => coerce_flag(&s),
        RawValue::Null(()) => false,
    })
}

/// Deserializer for optional dates; unreadable values become `None`.
pub fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawValue::deserialize(deserializer)? {
        RawValue::Text(s) => coerce_date(&s),
        _ => None,
    })
}

/// Deserializer for optional times of day; unreadable values become `None`.
pub fn lenient_time<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawValue::deserialize(deserializer)? {
        RawValue::Text(s) => coerce_time(&s),
        _ => None,
    })
}
