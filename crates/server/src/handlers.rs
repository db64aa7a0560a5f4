//! Report endpoints.
//!
//! Each handler validates its body, builds request-scoped credentials and
//! delegates to [`BillingApi`]. Presence of every required field is checked
//! before any field is parsed, so a missing field always wins over a
//! malformed one.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use stats_billing::{
    parse_day, ApiKeyBill, BillingError, BillingMonth, CategoryFilter, Credentials, DailyReports,
    DayRange, ModelTypeSummary, MonthlyModelDetail,
};
use tracing::info;

use crate::error::ApiError;
use crate::server::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Body of `POST /api/daily-bills`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBillsRequest {
    pub cookie: Option<String>,
    pub date: Option<String>,
    pub subject_id: Option<String>,
}

/// Body of `POST /api/daily-bills/range`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRangeRequest {
    pub cookie: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub subject_id: Option<String>,
}

/// Body of the monthly endpoints. `model_type` is only read by the
/// grouped by-model report.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBillsRequest {
    pub cookie: Option<String>,
    pub month: Option<String>,
    pub model_type: Option<String>,
    pub subject_id: Option<String>,
}

/// Keep a field only if it is present and non-empty.
fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

fn parse_month(month: &str) -> Result<BillingMonth, BillingError> {
    month.parse()
}

/// Daily cost grouped by model type.
pub async fn daily_bills(
    State(state): State<AppState>,
    payload: Result<Json<DailyBillsRequest>, JsonRejection>,
) -> ApiResult<Vec<ModelTypeSummary>> {
    let Json(request) = payload?;
    let (Some(cookie), Some(date)) = (present(request.cookie), present(request.date)) else {
        return Err(BillingError::missing_parameters().into());
    };
    let date = parse_day(&date)?;
    let credentials = Credentials::new(&cookie, request.subject_id)?;

    info!(%date, variant = credentials.variant().name(), "Daily report requested");
    let report = state.billing.daily_by_model(&credentials, date).await?;
    Ok(Json(report))
}

/// Daily cost for every day of a range, keyed by date.
pub async fn daily_bills_range(
    State(state): State<AppState>,
    payload: Result<Json<DailyRangeRequest>, JsonRejection>,
) -> ApiResult<DailyReports> {
    let Json(request) = payload?;
    let (Some(cookie), Some(start), Some(end)) = (
        present(request.cookie),
        present(request.start_date),
        present(request.end_date),
    ) else {
        return Err(BillingError::missing_parameters().into());
    };
    let range = DayRange::new(parse_day(&start)?, parse_day(&end)?, state.max_range_days)?;
    let credentials = Credentials::new(&cookie, request.subject_id)?;

    info!(%start, %end, variant = credentials.variant().name(), "Daily range report requested");
    let reports = state.billing.daily_range(&credentials, range).await?;
    Ok(Json(reports))
}

/// Monthly cost grouped by model type, optionally narrowed to one type.
pub async fn monthly_bills_model(
    State(state): State<AppState>,
    payload: Result<Json<MonthlyBillsRequest>, JsonRejection>,
) -> ApiResult<Vec<ModelTypeSummary>> {
    let Json(request) = payload?;
    let (Some(cookie), Some(month)) = (present(request.cookie), present(request.month)) else {
        return Err(BillingError::missing_parameters().into());
    };
    let month = parse_month(&month)?;
    let filter = CategoryFilter::from_param(request.model_type.as_deref());
    let credentials = Credentials::new(&cookie, request.subject_id)?;

    info!(%month, ?filter, variant = credentials.variant().name(), "Monthly model report requested");
    let report = state
        .billing
        .monthly_by_model(&credentials, month, &filter)
        .await?;
    Ok(Json(report))
}

/// Monthly per-model detail rows, ungrouped.
pub async fn monthly_bills_model_detail(
    State(state): State<AppState>,
    payload: Result<Json<MonthlyBillsRequest>, JsonRejection>,
) -> ApiResult<Vec<MonthlyModelDetail>> {
    let Json(request) = payload?;
    let (Some(cookie), Some(month)) = (present(request.cookie), present(request.month)) else {
        return Err(BillingError::missing_parameters().into());
    };
    let month = parse_month(&month)?;
    let credentials = Credentials::new(&cookie, request.subject_id)?;

    info!(%month, variant = credentials.variant().name(), "Monthly model detail requested");
    let rows = state
        .billing
        .monthly_model_detail(&credentials, month)
        .await?;
    Ok(Json(rows))
}

/// Monthly cost per API key.
pub async fn monthly_bills_apikey(
    State(state): State<AppState>,
    payload: Result<Json<MonthlyBillsRequest>, JsonRejection>,
) -> ApiResult<Vec<ApiKeyBill>> {
    let Json(request) = payload?;
    let (Some(cookie), Some(month)) = (present(request.cookie), present(request.month)) else {
        return Err(BillingError::missing_parameters().into());
    };
    let month = parse_month(&month)?;
    let credentials = Credentials::new(&cookie, request.subject_id)?;

    info!(%month, variant = credentials.variant().name(), "Monthly API key report requested");
    let rows = state.billing.monthly_by_apikey(&credentials, month).await?;
    Ok(Json(rows))
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "stats-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
