//! Report pipelines: upstream call, validation, then aggregation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use crate::aggregation::{
    aggregate_by_model, filter_categories, monthly_model_details, resolve_api_key_bills,
    ApiKeyBill, CategoryFilter, IdentityMap, IdentitySource, ModelTypeSummary, MonthlyModelDetail,
};
use crate::error::BillingError;
use crate::period::{day_key, BillingMonth, DayRange};
use crate::upstream::{
    decode_items, ApiKeyCostLine, ApiKeyRecord, ApiVariant, BillQuery, Credentials,
    ModelCostLine, UpstreamClient,
};

/// Daily reports keyed by `YYYY-MM-DD`.
pub type DailyReports = BTreeMap<String, Vec<ModelTypeSummary>>;

/// Billing reports available to the dashboard.
///
/// Every call is request-scoped: credentials come in with the call and
/// nothing is kept between calls.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Per-model cost for one day, grouped by model type.
    ///
    /// # Errors
    ///
    /// Any [`BillingError`] raised by the upstream call or aggregation.
    async fn daily_by_model(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
    ) -> Result<Vec<ModelTypeSummary>, BillingError>;

    /// Per-model cost for one month, grouped by model type and filtered.
    ///
    /// # Errors
    ///
    /// Any [`BillingError`] raised by the upstream call or aggregation.
    async fn monthly_by_model(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
        filter: &CategoryFilter,
    ) -> Result<Vec<ModelTypeSummary>, BillingError>;

    /// Ungrouped month detail rows.
    ///
    /// # Errors
    ///
    /// Any [`BillingError`] raised by the upstream call or conversion.
    async fn monthly_model_detail(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
    ) -> Result<Vec<MonthlyModelDetail>, BillingError>;

    /// Per-API-key cost for one month.
    ///
    /// # Errors
    ///
    /// Any [`BillingError`] raised by either upstream call or resolution.
    async fn monthly_by_apikey(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
    ) -> Result<Vec<ApiKeyBill>, BillingError>;

    /// Daily reports for every day in `range`, fetched concurrently.
    ///
    /// The first failure aborts the whole range.
    ///
    /// # Errors
    ///
    /// The first [`BillingError`] raised by any of the daily reports.
    async fn daily_range(
        &self,
        credentials: &Credentials,
        range: DayRange,
    ) -> Result<DailyReports, BillingError> {
        let reports = try_join_all(range.days().map(|day| async move {
            self.daily_by_model(credentials, day)
                .await
                .map(|report| (day_key(day), report))
        }))
        .await?;
        Ok(reports.into_iter().collect())
    }
}

/// [`BillingApi`] backed by the live upstream.
#[derive(Debug, Clone)]
pub struct BillingService {
    client: UpstreamClient,
}

impl BillingService {
    /// Wrap an upstream client.
    #[must_use]
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    async fn model_lines(
        &self,
        credentials: &Credentials,
        query: BillQuery,
    ) -> Result<Vec<ModelCostLine>, BillingError> {
        let items = self.client.fetch_bill(credentials, query).await?;
        decode_items(items)
    }
}

#[async_trait]
impl BillingApi for BillingService {
    #[instrument(skip(self, credentials), fields(variant = credentials.variant().name()))]
    async fn daily_by_model(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
    ) -> Result<Vec<ModelTypeSummary>, BillingError> {
        let lines = self
            .model_lines(credentials, BillQuery::DayCost(date))
            .await?;
        let report = aggregate_by_model(&lines)?;
        info!(lines = lines.len(), categories = report.len(), "Built daily report");
        Ok(report)
    }

    #[instrument(skip(self, credentials), fields(variant = credentials.variant().name()))]
    async fn monthly_by_model(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
        filter: &CategoryFilter,
    ) -> Result<Vec<ModelTypeSummary>, BillingError> {
        let lines = self
            .model_lines(credentials, BillQuery::MonthDetailModel(month))
            .await?;
        let report = filter_categories(aggregate_by_model(&lines)?, filter);
        info!(lines = lines.len(), categories = report.len(), "Built monthly model report");
        Ok(report)
    }

    #[instrument(skip(self, credentials), fields(variant = credentials.variant().name()))]
    async fn monthly_model_detail(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
    ) -> Result<Vec<MonthlyModelDetail>, BillingError> {
        let lines = self
            .model_lines(credentials, BillQuery::MonthDetailModel(month))
            .await?;
        monthly_model_details(lines)
    }

    #[instrument(skip(self, credentials), fields(variant = credentials.variant().name()))]
    async fn monthly_by_apikey(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
    ) -> Result<Vec<ApiKeyBill>, BillingError> {
        let query = BillQuery::MonthDetailApiKey(month);

        let report = match credentials.variant() {
            ApiVariant::Tenant { .. } => {
                let items = self.client.fetch_bill(credentials, query).await?;
                let lines: Vec<ApiKeyCostLine> = decode_items(items)?;
                resolve_api_key_bills(lines, IdentitySource::Embedded)?
            }
            ApiVariant::Legacy => {
                // Both calls must succeed before anything is produced.
                let (bill_items, key_items) = tokio::try_join!(
                    self.client.fetch_bill(credentials, query),
                    self.client.fetch_key_directory(credentials),
                )?;
                let lines: Vec<ApiKeyCostLine> = decode_items(bill_items)?;
                let records: Vec<ApiKeyRecord> = decode_items(key_items)?;
                let identities = IdentityMap::from_records(records);
                debug!(known_keys = identities.len(), "Loaded API key directory");
                resolve_api_key_bills(lines, IdentitySource::Directory(&identities))?
            }
        };

        info!(keys = report.len(), "Built monthly API key report");
        Ok(report)
    }
}
