//! Upstream JSON envelope validation.
//!
//! Every upstream payload is wrapped as
//! `{ "status": .., "ok": .., "code": .., "message": .., "data": { "<payload>": [..] } }`.
//! The flags are loosely typed upstream, so they are checked for truthiness
//! rather than for a strict boolean.

use serde_json::{Map, Value};

use crate::error::BillingError;

/// Which envelope fields must be present and truthy for a given endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeRules {
    /// Whether the extra `ok` flag is required.
    pub require_ok: bool,
    /// Name of the array under `data` holding the payload.
    pub payload: &'static str,
}

impl EnvelopeRules {
    /// Legacy redirect-style billing endpoints.
    pub const LEGACY_BILLING: Self = Self {
        require_ok: true,
        payload: "results",
    };

    /// Tenant-header REST billing endpoints. These do not send `ok`.
    pub const TENANT_BILLING: Self = Self {
        require_ok: false,
        payload: "results",
    };

    /// API-key directory used for identity resolution.
    pub const KEY_DIRECTORY: Self = Self {
        require_ok: false,
        payload: "records",
    };
}

/// Parse `body` and return the payload array.
///
/// # Errors
///
/// [`BillingError::Malformed`] if the body is not a JSON object, and
/// [`BillingError::Upstream`] if a required flag is falsy or the payload
/// array is missing.
pub fn parse_envelope(body: &str, rules: EnvelopeRules) -> Result<Vec<Value>, BillingError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| BillingError::Malformed(format!("response is not JSON: {e}")))?;

    let Value::Object(mut envelope) = root else {
        return Err(BillingError::Malformed(
            "response envelope is not a JSON object".to_string(),
        ));
    };

    let flags_ok = is_truthy(envelope.get("status"))
        && (!rules.require_ok || is_truthy(envelope.get("ok")));

    let payload = envelope
        .get_mut("data")
        .and_then(|data| data.get_mut(rules.payload))
        .map(Value::take);

    match payload {
        Some(Value::Array(items)) if flags_ok => Ok(items),
        _ => Err(upstream_failure(&envelope)),
    }
}

fn upstream_failure(envelope: &Map<String, Value>) -> BillingError {
    let code = envelope.get("code").and_then(|code| match code {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    let message = match envelope.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown error".to_string(),
        Some(other) => other.to_string(),
    };

    BillingError::Upstream { code, message }
}

/// Loose truthiness: `null`, `false`, `0` and `""` are falsy.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}
