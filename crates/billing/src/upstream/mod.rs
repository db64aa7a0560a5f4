//! SiliconCloud billing API access.
//!
//! Two upstream generations are supported behind one client:
//!
//! - **Legacy**: `GET /api/redirect/bill?action=...`, envelope flags
//!   `status` and `ok`; API-key names come from a second call to
//!   `POST /api/v1/apikey/all`.
//! - **Tenant**: `GET /biz-server/api/v1/invoices/<report>` with an
//!   `x-subject-id` header, envelope flag `status` only; API-key names are
//!   embedded in the billing lines.
//!
//! Every response goes through the same checks, in order: transport,
//! session expiry ([`session`]), then the envelope ([`envelope`]).

mod client;
pub mod envelope;
mod models;
pub mod session;

pub use client::{
    ApiVariant, BillQuery, Credentials, UpstreamClient, UpstreamEndpoints, DEFAULT_BASE_URL,
    SUBJECT_HEADER,
};
pub use models::{decode_items, ApiKeyCostLine, ApiKeyRecord, ModelCostLine};
