//! Grouped-by-type aggregation.

use indexmap::IndexMap;
use serde::Serialize;

use super::numeric;
use crate::error::BillingError;
use crate::upstream::ModelCostLine;

/// Sentinel category filter meaning "every category".
pub const ALL_CATEGORIES: &str = "all";

/// Usage and cost of one model within a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    /// Model name.
    pub name: String,
    /// Summed tokens.
    pub tokens: i64,
    /// Unit price of the first line seen for this model.
    pub unit_price: String,
    /// Summed amount.
    pub price: f64,
}

/// All models of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTypeSummary {
    /// Category key (model type).
    #[serde(rename = "type")]
    pub model_type: String,
    /// Sum of `models[].tokens`.
    pub total_tokens: i64,
    /// Per-model records.
    pub models: Vec<ModelUsage>,
}

/// Which categories survive aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Keep everything.
    #[default]
    All,
    /// Keep a single category.
    Only(String),
}

impl CategoryFilter {
    /// Interpret an optional request value; absent, blank and `"all"` keep
    /// every category.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            None | Some("" | ALL_CATEGORIES) => Self::All,
            Some(category) => Self::Only(category.to_string()),
        }
    }

    fn keeps(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }
}

/// Running totals for one (category, model) pair.
struct Accumulator {
    tokens: i64,
    unit_price: String,
    price: f64,
}

/// Group line items by model type, then by model name, summing tokens and
/// amounts.
///
/// Categories and models come out in first-seen order. The unit price of a
/// model is taken from its first line and never overwritten.
///
/// # Errors
///
/// Returns [`BillingError::Malformed`] for an empty key, an unparseable
/// token count or amount, or token sums that overflow; no partial result is
/// produced.
pub fn aggregate_by_model(lines: &[ModelCostLine]) -> Result<Vec<ModelTypeSummary>, BillingError> {
    let mut categories: IndexMap<String, IndexMap<String, Accumulator>> = IndexMap::new();

    for line in lines {
        if line.sub_type.is_empty() || line.model_name.is_empty() {
            return Err(BillingError::Malformed(
                "line item has an empty model type or model name".to_string(),
            ));
        }
        let tokens = numeric::token_count(&line.tokens)?;
        let price = numeric::amount("amount", &line.amount)?;

        let acc = categories
            .entry(line.sub_type.clone())
            .or_default()
            .entry(line.model_name.clone())
            .or_insert_with(|| Accumulator {
                tokens: 0,
                unit_price: line.unit_amount.clone(),
                price: 0.0,
            });
        acc.tokens = acc
            .tokens
            .checked_add(tokens)
            .ok_or_else(|| token_overflow(&line.model_name))?;
        acc.price += price;
    }

    categories
        .into_iter()
        .map(|(model_type, models)| {
            let models: Vec<ModelUsage> = models
                .into_iter()
                .map(|(name, acc)| ModelUsage {
                    name,
                    tokens: acc.tokens,
                    unit_price: acc.unit_price,
                    price: acc.price,
                })
                .collect();
            let total_tokens = models
                .iter()
                .try_fold(0_i64, |total, model| total.checked_add(model.tokens))
                .ok_or_else(|| token_overflow(&model_type))?;
            Ok(ModelTypeSummary {
                model_type,
                total_tokens,
                models,
            })
        })
        .collect()
}

fn token_overflow(key: &str) -> BillingError {
    BillingError::Malformed(format!("token total for '{key}' overflows"))
}

/// Drop categories the filter does not keep. Runs on aggregated output only.
#[must_use]
pub fn filter_categories(
    summaries: Vec<ModelTypeSummary>,
    filter: &CategoryFilter,
) -> Vec<ModelTypeSummary> {
    summaries
        .into_iter()
        .filter(|summary| filter.keeps(&summary.model_type))
        .collect()
}
