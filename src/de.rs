//! Lenient `deserialize_with` helpers for exiftool values.
//!
//! exiftool prints the same tag as a number for one file and as a string
//! for the next (`"4.7 mm"`, `"undef"`, `"inf"`). These helpers accept
//! whatever arrives and fall back to `None` instead of failing the whole
//! struct.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

/// String or number into a `String`. Lists are joined with `", "`.
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(crate::metadata::value_to_clean_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Some(other) => Some(other.to_string()),
    })
}

/// Integers, integral floats, and strings starting with an integer (`"72 dpi"`).
pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => first_token(&s),
        _ => None,
    })
}

/// Numbers and numeric strings. `"undef"` and other text become `None`.
pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s == "undef" => None,
        Some(Value::String(s)) => first_token(&s),
        _ => None,
    })
}

/// Any `FromStr` type. Values that don't parse are logged and dropped.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => parse_logged(&s),
        Some(other) => parse_logged(&other.to_string()),
    })
}

fn first_token<T: FromStr>(s: &str) -> Option<T> {
    let s = s.trim();
    s.parse()
        .ok()
        .or_else(|| s.split_whitespace().next()?.parse().ok())
}

fn parse_logged<T>(s: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    match s.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("Ignoring unparseable value {s:?}: {err}");
            None
        }
    }
}
