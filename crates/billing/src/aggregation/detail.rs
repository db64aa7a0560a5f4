//! Flat monthly per-model detail rows.

use serde::Serialize;
use serde_json::Value;

use super::numeric;
use crate::error::BillingError;
use crate::upstream::ModelCostLine;

/// One upstream month-detail line, with its amounts parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyModelDetail {
    /// Model name.
    pub model_name: String,
    /// Model type.
    pub sub_type: String,
    /// Unit price, verbatim.
    pub unit_amount: String,
    /// Token usage, as sent upstream.
    pub tokens: Value,
    /// Total amount.
    pub price: f64,
    /// Charged part of the amount.
    pub charge_price: f64,
    /// Part of the amount covered by free quota.
    pub free_price: f64,
}

/// Convert each line to a detail row without grouping.
///
/// # Errors
///
/// Returns [`BillingError::Malformed`] if any of the three amounts is not a
/// decimal.
pub fn monthly_model_details(
    lines: Vec<ModelCostLine>,
) -> Result<Vec<MonthlyModelDetail>, BillingError> {
    lines
        .into_iter()
        .map(|line| {
            Ok(MonthlyModelDetail {
                price: numeric::amount("amount", &line.amount)?,
                charge_price: numeric::amount("chargeAmount", &line.charge_amount)?,
                free_price: numeric::amount("freeAmount", &line.free_amount)?,
                model_name: line.model_name,
                sub_type: line.sub_type,
                unit_amount: line.unit_amount,
                tokens: line.tokens,
            })
        })
        .collect()
}
