//! Numeric field extraction for upstream line items.

use serde_json::Value;

use crate::error::BillingError;

/// Extract a token count.
///
/// Strings look like `"120 tokens"`: only the leading integer of the first
/// space-separated word counts, and anything after it is discarded.
///
/// # Errors
///
/// Returns [`BillingError::Malformed`] when no leading integer exists.
pub fn token_count(value: &Value) -> Result<i64, BillingError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(truncate))
            .ok_or_else(|| malformed("tokens", value)),
        Value::String(s) => integer_prefix(s.split(' ').next().unwrap_or_default())
            .ok_or_else(|| malformed("tokens", value)),
        _ => Err(malformed("tokens", value)),
    }
}

/// Parse a monetary amount sent as a decimal string (or a bare number).
///
/// # Errors
///
/// Returns [`BillingError::Malformed`] when the value is not a finite decimal.
pub fn amount(field: &'static str, value: &Value) -> Result<f64, BillingError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| malformed(field, value))
}

/// Leading-integer parse: optional whitespace and sign, then digits.
fn integer_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(f: f64) -> i64 {
    f.trunc() as i64
}

fn malformed(field: &str, value: &Value) -> BillingError {
    BillingError::Malformed(format!("unexpected {field} value: {value}"))
}
