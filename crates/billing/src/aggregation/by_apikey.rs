//! Flat per-key report with identity resolution.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::numeric;
use crate::error::BillingError;
use crate::upstream::{ApiKeyCostLine, ApiKeyRecord};

/// Key id the upstream uses for usage from the interactive web console.
pub const PLAYGROUND_KEY: &str = "playground";

/// Display name for playground usage.
pub const PLAYGROUND_LABEL: &str = "Playground";

/// Display name when a key cannot be resolved.
pub const UNKNOWN_LABEL: &str = "Unknown";

const DISABLED_STATUS: &str = "disabled";

/// One row of the per-key report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyBill {
    /// Human-readable key name.
    pub name: String,
    /// Whether the key has been disabled.
    pub is_disabled: bool,
    /// LLM token usage, as sent upstream.
    pub llm_tokens: Value,
    /// Image token usage, as sent upstream.
    pub image_tokens: Value,
    /// Amount billed to the key.
    pub price: f64,
}

/// Resolved identity of one API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyIdentity {
    /// Description, or a masked form of the key when none is set.
    pub name: String,
    /// Whether the key has been disabled.
    pub is_disabled: bool,
}

/// Secret key to identity lookup, built from the key directory.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    keys: HashMap<String, ApiKeyIdentity>,
}

impl IdentityMap {
    /// Build the map from directory records. A later duplicate key replaces
    /// an earlier one.
    #[must_use]
    pub fn from_records(records: Vec<ApiKeyRecord>) -> Self {
        let keys = records
            .into_iter()
            .map(|record| {
                let name = match record.description.as_deref() {
                    Some(description) if !description.is_empty() => description.to_string(),
                    _ => masked_key_name(&record.secret_key),
                };
                let identity = ApiKeyIdentity {
                    name,
                    is_disabled: is_disabled(record.status.as_deref()),
                };
                (record.secret_key, identity)
            })
            .collect();
        Self { keys }
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, secret_key: &str) -> Option<&ApiKeyIdentity> {
        self.keys.get(secret_key)
    }

    /// Number of known keys.
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Where display names and disabled flags come from.
#[derive(Debug, Clone, Copy)]
pub enum IdentitySource<'a> {
    /// A separately fetched directory (legacy upstream).
    Directory(&'a IdentityMap),
    /// Fields embedded in each line item (tenant upstream).
    Embedded,
}

/// Map every line 1:1 to a report row, resolving names and disabled flags.
///
/// Playground usage is always labelled [`PLAYGROUND_LABEL`], whatever the
/// identity source says about that id.
///
/// # Errors
///
/// Returns [`BillingError::Malformed`] if an amount cannot be parsed.
pub fn resolve_api_key_bills(
    lines: Vec<ApiKeyCostLine>,
    source: IdentitySource<'_>,
) -> Result<Vec<ApiKeyBill>, BillingError> {
    lines
        .into_iter()
        .map(|line| {
            let price = numeric::amount("amount", &line.amount)?;
            let identity = match source {
                IdentitySource::Directory(map) => map.get(&line.api_key).cloned(),
                IdentitySource::Embedded => Some(embedded_identity(&line)),
            };

            let name = if line.api_key == PLAYGROUND_KEY {
                PLAYGROUND_LABEL.to_string()
            } else {
                identity
                    .as_ref()
                    .map_or_else(|| UNKNOWN_LABEL.to_string(), |id| id.name.clone())
            };

            Ok(ApiKeyBill {
                name,
                is_disabled: identity.is_some_and(|id| id.is_disabled),
                llm_tokens: line.llm_tokens,
                image_tokens: line.image_tokens,
                price,
            })
        })
        .collect()
}

fn embedded_identity(line: &ApiKeyCostLine) -> ApiKeyIdentity {
    let name = match line.api_key_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => masked_key_name(&line.api_key),
    };
    ApiKeyIdentity {
        name,
        is_disabled: is_disabled(line.api_key_status.as_deref()),
    }
}

fn is_disabled(status: Option<&str>) -> bool {
    status == Some(DISABLED_STATUS)
}

/// Fallback name showing only the last four characters of the key.
#[must_use]
pub fn masked_key_name(secret_key: &str) -> String {
    let tail: String = {
        let chars: Vec<char> = secret_key.chars().collect();
        chars[chars.len().saturating_sub(4)..].iter().collect()
    };
    format!("Unnamed (sk-***{tail})")
}
