//! Upstream billing line item models.
//!
//! Field names are fixed by the upstream cloud. Numeric fields arrive as
//! strings or numbers depending on the endpoint, so they are kept as raw
//! [`Value`]s here and converted during aggregation.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::BillingError;

/// Line item from the daily-cost and month-detail-by-model reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCostLine {
    /// Model type (chat, embedding, reranker, text-to-image, ...).
    pub sub_type: String,
    /// Model name.
    pub model_name: String,
    /// Token count, either a number or `"<n> <unit>"`.
    pub tokens: Value,
    /// Unit price, kept verbatim.
    #[serde(default, deserialize_with = "opaque_string")]
    pub unit_amount: String,
    /// Monetary amount as a decimal string.
    pub amount: Value,
    /// Charged part of `amount` (month detail only).
    #[serde(default)]
    pub charge_amount: Value,
    /// Free-quota part of `amount` (month detail only).
    #[serde(default)]
    pub free_amount: Value,
}

/// Line item from the month-detail-by-apikey report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCostLine {
    /// Secret key the usage was billed to, or `playground`.
    pub api_key: String,
    /// LLM token usage, passed through untouched.
    #[serde(default)]
    pub llm_tokens: Value,
    /// Image token usage, passed through untouched.
    #[serde(default)]
    pub image_tokens: Value,
    /// Monetary amount as a decimal string.
    pub amount: Value,
    /// Key display name (tenant variant only).
    #[serde(default)]
    pub api_key_name: Option<String>,
    /// Key status, `"disabled"` when revoked (tenant variant only).
    #[serde(default)]
    pub api_key_status: Option<String>,
}

/// Record from the API-key directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    /// The secret key itself.
    pub secret_key: String,
    /// User-supplied description.
    #[serde(default)]
    pub description: Option<String>,
    /// Key status, `"disabled"` when revoked.
    #[serde(default)]
    pub status: Option<String>,
}

/// Decode every payload item into `T`.
///
/// # Errors
///
/// Returns [`BillingError::Malformed`] naming the first item that does not
/// match the expected shape.
pub fn decode_items<T>(items: Vec<Value>) -> Result<Vec<T>, BillingError>
where
    T: serde::de::DeserializeOwned,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| BillingError::Malformed(format!("line item {index}: {e}")))
        })
        .collect()
}

fn opaque_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
