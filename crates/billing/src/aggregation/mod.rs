//! Reshaping of upstream line items into display-ready reports.
//!
//! - [`aggregate_by_model`] groups by model type and model name, summing
//!   tokens and amounts.
//! - [`resolve_api_key_bills`] maps per-key lines 1:1, resolving display
//!   names and disabled flags.
//! - [`monthly_model_details`] converts month detail lines without grouping.

mod by_apikey;
mod by_model;
mod detail;
pub mod numeric;

pub use by_apikey::{
    masked_key_name, resolve_api_key_bills, ApiKeyBill, ApiKeyIdentity, IdentityMap,
    IdentitySource, PLAYGROUND_KEY, PLAYGROUND_LABEL, UNKNOWN_LABEL,
};
pub use by_model::{
    aggregate_by_model, filter_categories, CategoryFilter, ModelTypeSummary, ModelUsage,
    ALL_CATEGORIES,
};
pub use detail::{monthly_model_details, MonthlyModelDetail};
