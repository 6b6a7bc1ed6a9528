//! Lenient scalar coercion for loosely-typed backend fields.
//!
//! The statistics API has sent the same metric as a JSON number, a numeric
//! string and occasionally a boolean depending on the endpoint and backend
//! version. These helpers never fail: anything unusable is `None` and the
//! caller picks the default.

use serde_json::Value;

/// Read a finite number from a JSON value.
///
/// Numbers are used as-is, strings are trimmed and parsed, booleans count as
/// `1`/`0`. `NaN`, infinities, blank strings and every other shape give
/// `None`.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Read a non-negative integral count (`count` envelope fields).
pub fn count(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let n = value.as_f64()?;
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

/// Read a non-blank display string. Numbers are rendered as text so that
/// codes like a department number still make a usable label.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a pagination cursor: a string, or nothing.
pub fn cursor(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}
