#![allow(clippy::doc_markdown)] // Allow brand names like SiliconCloud without backticks

//! Billing reports for the SiliconCloud stats dashboard.
//!
//! This crate sits between the dashboard's HTTP layer and the SiliconCloud
//! billing API. It forwards a caller-supplied session cookie upstream,
//! validates what comes back and reshapes it for display:
//!
//! - **Daily cost by model** - line items grouped by model type, then by
//!   model name, with tokens and amounts summed
//! - **Monthly cost by model** - the same grouping, optionally narrowed to
//!   one model type
//! - **Monthly cost by API key** - one row per key with a resolved display
//!   name and disabled flag
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stats_billing::{BillingApi, BillingService, Credentials, UpstreamClient, UpstreamEndpoints};
//!
//! let service = BillingService::new(UpstreamClient::new(UpstreamEndpoints::default())?);
//! let credentials = Credentials::new(&cookie_from_browser, None)?;
//!
//! let report = service
//!     .daily_by_model(&credentials, "2024-12-01".parse()?)
//!     .await?;
//!
//! for group in report {
//!     println!("{}: {} tokens", group.model_type, group.total_tokens);
//! }
//! ```
//!
//! ## Failure layers
//!
//! Each upstream response is checked for transport failure, then for an
//! expired session (the login page), then for an application-level error in
//! the JSON envelope. See [`BillingError::status_code`] for how each layer
//! maps to an HTTP status.

pub mod aggregation;
pub mod error;
pub mod period;
pub mod reports;
pub mod upstream;

pub use aggregation::{
    ApiKeyBill, CategoryFilter, ModelTypeSummary, ModelUsage, MonthlyModelDetail,
};
pub use error::BillingError;
pub use period::{parse_day, BillingMonth, DayRange};
pub use reports::{BillingApi, BillingService, DailyReports};
pub use upstream::{ApiVariant, Credentials, UpstreamClient, UpstreamEndpoints};
