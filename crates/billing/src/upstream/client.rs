//! HTTP client for the SiliconCloud billing endpoints.

use chrono::NaiveDate;
use reqwest::{
    header::{self, HeaderValue},
    Client, RequestBuilder,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::envelope::{parse_envelope, EnvelopeRules};
use super::session::ensure_session_valid;
use crate::error::BillingError;
use crate::period::BillingMonth;

/// Default upstream origin for both API variants.
pub const DEFAULT_BASE_URL: &str = "https://cloud.siliconflow.cn";

/// Header carrying the tenant (subject) id on the REST variant.
pub const SUBJECT_HEADER: &str = "x-subject-id";

const LEGACY_BILL_PATH: &str = "api/redirect/bill";
const KEY_DIRECTORY_PATH: &str = "api/v1/apikey/all";
const TENANT_INVOICE_PATH: &str = "biz-server/api/v1/invoices";

/// Which upstream API generation a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiVariant {
    /// Redirect endpoint selected by an `action` query parameter.
    Legacy,
    /// REST endpoint selected by path, scoped by a tenant header.
    Tenant {
        /// Tenant (subject) identifier.
        subject_id: String,
    },
}

impl ApiVariant {
    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Tenant { .. } => "tenant",
        }
    }
}

/// Request-scoped caller credentials.
///
/// The cookie is opaque; it is forwarded verbatim and never inspected
/// beyond being a legal header value.
#[derive(Clone)]
pub struct Credentials {
    cookie: HeaderValue,
    variant: ApiVariant,
}

impl Credentials {
    /// Build credentials. A present, non-empty `subject_id` selects the
    /// tenant variant; otherwise the legacy variant is used.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidRequest`] if the cookie or subject id
    /// cannot be sent as an HTTP header value.
    pub fn new(cookie: &str, subject_id: Option<String>) -> Result<Self, BillingError> {
        let mut cookie =
            HeaderValue::from_str(cookie).map_err(|_| BillingError::invalid_parameters())?;
        cookie.set_sensitive(true);

        let variant = match subject_id {
            Some(subject_id) if !subject_id.trim().is_empty() => {
                HeaderValue::from_str(&subject_id)
                    .map_err(|_| BillingError::invalid_parameters())?;
                ApiVariant::Tenant { subject_id }
            }
            _ => ApiVariant::Legacy,
        };
        Ok(Self { cookie, variant })
    }

    /// Upstream variant these credentials target.
    #[must_use]
    pub fn variant(&self) -> &ApiVariant {
        &self.variant
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cookie", &"<redacted>")
            .field("variant", &self.variant)
            .finish()
    }
}

/// One upstream billing report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillQuery {
    /// Per-model cost for a single day.
    DayCost(NaiveDate),
    /// Per-model cost detail for a month.
    MonthDetailModel(BillingMonth),
    /// Per-API-key cost detail for a month.
    MonthDetailApiKey(BillingMonth),
}

impl BillQuery {
    fn action(self) -> &'static str {
        match self {
            Self::DayCost(_) => "invoices/day_cost",
            Self::MonthDetailModel(_) => "invoices/month_detail_model",
            Self::MonthDetailApiKey(_) => "invoices/month_detail_apikey",
        }
    }

    fn rest_path(self) -> &'static str {
        match self {
            Self::DayCost(_) => "day_cost",
            Self::MonthDetailModel(_) => "month_detail_model",
            Self::MonthDetailApiKey(_) => "month_detail_apikey",
        }
    }

    fn period_params(self) -> Vec<(&'static str, String)> {
        match self {
            Self::DayCost(date) => vec![
                ("date", date.format("%Y-%m-%d").to_string()),
                ("apiKeyId", "-1".to_string()),
            ],
            Self::MonthDetailModel(month) | Self::MonthDetailApiKey(month) => {
                vec![("month", month.to_string())]
            }
        }
    }

    /// Query string pairs for the given variant.
    fn query(self, variant: &ApiVariant) -> Vec<(&'static str, String)> {
        let mut params = self.period_params();
        if *variant == ApiVariant::Legacy {
            params.insert(0, ("action", self.action().to_string()));
        }
        params
    }
}

/// Base URLs for the two upstream variants.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoints {
    /// Origin serving the legacy redirect and key directory endpoints.
    pub legacy_base: Url,
    /// Origin serving the tenant REST endpoints.
    pub tenant_base: Url,
}

impl UpstreamEndpoints {
    /// Parse both base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Config`] if either URL is invalid.
    pub fn parse(legacy_base: &str, tenant_base: &str) -> Result<Self, BillingError> {
        Ok(Self {
            legacy_base: parse_base(legacy_base)?,
            tenant_base: parse_base(tenant_base)?,
        })
    }

    fn legacy(&self, path: &str) -> Result<Url, BillingError> {
        join(&self.legacy_base, path)
    }

    fn tenant(&self, path: &str) -> Result<Url, BillingError> {
        join(&self.tenant_base, path)
    }
}

impl Default for UpstreamEndpoints {
    fn default() -> Self {
        let base = Url::parse(&format!("{DEFAULT_BASE_URL}/")).expect("default base URL is valid");
        Self {
            legacy_base: base.clone(),
            tenant_base: base,
        }
    }
}

/// Make sure the base path ends with `/` so relative joins append to it.
fn parse_base(raw: &str) -> Result<Url, BillingError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| BillingError::Config(format!("invalid upstream URL '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(BillingError::Config(format!(
            "upstream URL '{raw}' cannot be used as a base"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url, BillingError> {
    base.join(path)
        .map_err(|e| BillingError::Config(format!("invalid upstream path '{path}': {e}")))
}

/// SiliconCloud billing API client.
///
/// Holds no per-user state: credentials are passed into every call.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoints: UpstreamEndpoints,
}

impl UpstreamClient {
    /// Create a client for the given endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoints: UpstreamEndpoints) -> Result<Self, BillingError> {
        let client = Client::builder()
            .user_agent(concat!("stats-billing/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BillingError::Transport)?;

        Ok(Self { client, endpoints })
    }

    /// Fetch a billing report and return its validated result array.
    ///
    /// # Errors
    ///
    /// Transport, session-expiry, malformed-body and upstream-envelope
    /// failures, in that order of precedence.
    #[instrument(skip(self, credentials), fields(variant = credentials.variant().name()))]
    pub async fn fetch_bill(
        &self,
        credentials: &Credentials,
        query: BillQuery,
    ) -> Result<Vec<Value>, BillingError> {
        let (url, rules) = match credentials.variant() {
            ApiVariant::Legacy => (
                self.endpoints.legacy(LEGACY_BILL_PATH)?,
                EnvelopeRules::LEGACY_BILLING,
            ),
            ApiVariant::Tenant { .. } => (
                self.endpoints
                    .tenant(&format!("{TENANT_INVOICE_PATH}/{}", query.rest_path()))?,
                EnvelopeRules::TENANT_BILLING,
            ),
        };

        let mut request = self
            .client
            .get(url)
            .query(&query.query(credentials.variant()));
        if let ApiVariant::Tenant { subject_id } = credentials.variant() {
            request = request.header(SUBJECT_HEADER, subject_id);
        }

        let body = self.send(request, &credentials.cookie).await?;
        ensure_session_valid(&body)?;
        parse_envelope(&body, rules)
    }

    /// Fetch the account's API-key directory (legacy variant only).
    ///
    /// # Errors
    ///
    /// Same failure layers as [`Self::fetch_bill`].
    #[instrument(skip(self, credentials))]
    pub async fn fetch_key_directory(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<Value>, BillingError> {
        let url = self.endpoints.legacy(KEY_DIRECTORY_PATH)?;
        let body = self
            .send(self.client.post(url), &credentials.cookie)
            .await?;
        ensure_session_valid(&body)?;
        parse_envelope(&body, EnvelopeRules::KEY_DIRECTORY)
    }

    /// Attach the cookie and cache headers, send, and return the raw body.
    ///
    /// Non-2xx statuses are not errors here; the body is inspected instead.
    async fn send(
        &self,
        request: RequestBuilder,
        cookie: &HeaderValue,
    ) -> Result<String, BillingError> {
        let response = request
            .header(header::COOKIE, cookie.clone())
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "Upstream responded");
        if !status.is_success() {
            warn!(status = status.as_u16(), "Upstream returned non-success status");
        }

        Ok(response.text().await?)
    }
}
