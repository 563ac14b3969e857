//! Lenient decimal decoding for loosely typed backend fields.
//!
//! Catalog prices and stock levels arrive as JSON numbers, numeric strings,
//! `null`, or occasionally garbage. Anything that is not a number decodes to
//! `None`; callers that need a number go through [`price_or_zero`] so the
//! zero-substitution is explicit at the call site.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Normalizes a missing or unreadable price to zero.
///
/// A line with no usable price contributes nothing to totals instead of
/// failing the whole order.
#[must_use]
pub fn price_or_zero(price: Option<Decimal>) -> Decimal {
    price.unwrap_or(Decimal::ZERO)
}

/// Reads a decimal out of an arbitrary JSON value.
#[must_use]
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Value::String(s) => {
            let trimmed = s.trim();
            Decimal::from_str(trimmed)
                .ok()
                .or_else(|| Decimal::from_scientific(trimmed).ok())
        }
        _ => None,
    }
}

/// `deserialize_with` helper for optional, loosely typed decimal fields.
///
/// # Errors
///
/// Only fails when the input is not valid JSON; unreadable values become `None`.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_json))
}
