//! Mapping of billing failures onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stats_billing::BillingError;
use tracing::{error, warn};

/// Message shown for failures whose detail stays in the logs.
pub const GENERIC_FAILURE: &str = "Failed to fetch bill data";

/// Handler error. Always rendered as `{ "message": ... }`.
#[derive(Debug)]
pub struct ApiError(pub BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "Rejected request body");
        Self(BillingError::invalid_parameters())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_public() {
            if !matches!(self.0, BillingError::InvalidRequest(_)) {
                warn!(status = status.as_u16(), error = %self.0, "Upstream rejected report request");
            }
            self.0.to_string()
        } else {
            error!(error = %self.0, "Failed to fetch bill data");
            GENERIC_FAILURE.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
