//! Null-tolerant decoding for text fields of backend records.
//!
//! TableCRM rows are loosely typed: a name may be `null`, and a unit or
//! phone may arrive as a number. One such row must not fail the whole list,
//! so these helpers decode anything they cannot use to the field's default.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `deserialize_with` helper mapping `null` to `T::default()`.
///
/// # Errors
///
/// Fails when a non-null value does not decode as `T`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `deserialize_with` helper for optional text that may arrive as a number.
///
/// Strings are kept, numbers and booleans are rendered, anything else is
/// `None`. Blank strings are `None`.
///
/// # Errors
///
/// Only fails when the input is not valid JSON.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
