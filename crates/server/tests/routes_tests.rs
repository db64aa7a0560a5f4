//! Router tests.
//!
//! Most tests drive the router in-process against a recording fake
//! backend; the last ones wire the real upstream client to a mock upstream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use stats_billing::{
    ApiKeyBill, ApiVariant, BillingApi, BillingError, BillingMonth, CategoryFilter, Credentials,
    ModelTypeSummary, ModelUsage, MonthlyModelDetail,
};
use stats_server::{build_router, AppState, Config};
use tokio::sync::Mutex;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Fake backend
// =============================================================================

/// Records what the handlers passed in and answers with canned data or a
/// canned failure.
#[derive(Default)]
struct FakeBilling {
    fail_with: Mutex<Option<BillingError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeBilling {
    async fn failing(err: BillingError) -> Arc<Self> {
        let fake = Arc::new(Self::default());
        *fake.fail_with.lock().await = Some(err);
        fake
    }

    async fn record(&self, call: String) -> Result<(), BillingError> {
        self.calls.lock().await.push(call);
        match self.fail_with.lock().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn variant(credentials: &Credentials) -> String {
    match credentials.variant() {
        ApiVariant::Legacy => "legacy".to_string(),
        ApiVariant::Tenant { subject_id } => format!("tenant:{subject_id}"),
    }
}

fn summary(model_type: &str) -> ModelTypeSummary {
    ModelTypeSummary {
        model_type: model_type.to_string(),
        total_tokens: 10,
        models: vec![ModelUsage {
            name: "m".to_string(),
            tokens: 10,
            unit_price: "1".to_string(),
            price: 0.5,
        }],
    }
}

#[async_trait]
impl BillingApi for FakeBilling {
    async fn daily_by_model(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
    ) -> Result<Vec<ModelTypeSummary>, BillingError> {
        self.record(format!("daily {date} {}", variant(credentials)))
            .await?;
        Ok(vec![summary("chat")])
    }

    async fn monthly_by_model(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
        filter: &CategoryFilter,
    ) -> Result<Vec<ModelTypeSummary>, BillingError> {
        self.record(format!("monthly-model {month} {filter:?} {}", variant(credentials)))
            .await?;
        Ok(vec![summary("chat")])
    }

    async fn monthly_model_detail(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
    ) -> Result<Vec<MonthlyModelDetail>, BillingError> {
        self.record(format!("monthly-detail {month} {}", variant(credentials)))
            .await?;
        Ok(Vec::new())
    }

    async fn monthly_by_apikey(
        &self,
        credentials: &Credentials,
        month: BillingMonth,
    ) -> Result<Vec<ApiKeyBill>, BillingError> {
        self.record(format!("monthly-apikey {month} {}", variant(credentials)))
            .await?;
        Ok(vec![ApiKeyBill {
            name: "Playground".to_string(),
            is_disabled: false,
            llm_tokens: json!(3),
            image_tokens: json!("0"),
            price: 0.01,
        }])
    }
}

fn router(billing: Arc<FakeBilling>) -> Router {
    build_router(
        AppState {
            billing,
            max_range_days: 7,
        },
        Duration::from_secs(5),
    )
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, uri, body.to_string()).await
}

async fn send(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_daily_requires_cookie_and_date() {
    let fake = Arc::new(FakeBilling::default());

    for body in [
        json!({ "cookie": "c" }),
        json!({ "date": "2024-12-01" }),
        json!({ "cookie": "", "date": "2024-12-01" }),
        json!({}),
    ] {
        let (status, body) = post_json(router(fake.clone()), "/api/daily-bills", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing parameters");
    }

    assert!(fake.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_monthly_requires_cookie_and_month() {
    let fake = Arc::new(FakeBilling::default());
    for uri in [
        "/api/monthly-bills-model",
        "/api/monthly-bills-model/detail",
        "/api/monthly-bills-apikey",
    ] {
        let (status, body) = post_json(router(fake.clone()), uri, json!({ "cookie": "c" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["message"], "Missing parameters");
    }
    assert!(fake.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_malformed_date_is_400() {
    let fake = Arc::new(FakeBilling::default());
    let (status, body) = post_json(
        router(fake),
        "/api/daily-bills",
        json!({ "cookie": "c", "date": "12/01/2024" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid parameters");
}

#[tokio::test]
async fn test_unsendable_cookie_or_subject_is_400() {
    let fake = Arc::new(FakeBilling::default());

    for body in [
        json!({ "cookie": "session=abc\r\nX-Injected: 1", "date": "2024-12-01" }),
        json!({ "cookie": "session=abc", "date": "2024-12-01", "subjectId": "s\n1" }),
    ] {
        let (status, body) = post_json(router(fake.clone()), "/api/daily-bills", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid parameters");
    }

    assert!(fake.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_non_json_body_is_400_with_json_error() {
    let fake = Arc::new(FakeBilling::default());
    let (status, body) = send(router(fake), "/api/daily-bills", "cookie=c".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_range_over_limit_is_400() {
    let fake = Arc::new(FakeBilling::default());
    let (status, _) = post_json(
        router(fake.clone()),
        "/api/daily-bills/range",
        json!({ "cookie": "c", "startDate": "2024-12-01", "endDate": "2024-12-31" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(fake.calls.lock().await.is_empty());
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_daily_dispatches_with_legacy_variant() {
    let fake = Arc::new(FakeBilling::default());
    let (status, body) = post_json(
        router(fake.clone()),
        "/api/daily-bills",
        json!({ "cookie": "c", "date": "2024-12-01" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["type"], "chat");
    assert_eq!(body[0]["totalTokens"], 10);
    assert_eq!(*fake.calls.lock().await, ["daily 2024-12-01 legacy"]);
}

#[tokio::test]
async fn test_subject_id_selects_tenant_variant() {
    let fake = Arc::new(FakeBilling::default());
    let (status, _) = post_json(
        router(fake.clone()),
        "/api/monthly-bills-apikey",
        json!({ "cookie": "c", "month": "2024-12", "subjectId": "org-9" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        *fake.calls.lock().await,
        ["monthly-apikey 2024-12 tenant:org-9"]
    );
}

#[tokio::test]
async fn test_model_type_becomes_filter() {
    let fake = Arc::new(FakeBilling::default());
    post_json(
        router(fake.clone()),
        "/api/monthly-bills-model",
        json!({ "cookie": "c", "month": "2024-12", "modelType": "embedding" }),
    )
    .await;
    post_json(
        router(fake.clone()),
        "/api/monthly-bills-model",
        json!({ "cookie": "c", "month": "2024-12", "modelType": "all" }),
    )
    .await;

    let calls = fake.calls.lock().await;
    assert_eq!(calls[0], r#"monthly-model 2024-12 Only("embedding") legacy"#);
    assert_eq!(calls[1], "monthly-model 2024-12 All legacy");
}

#[tokio::test]
async fn test_range_returns_map_keyed_by_date() {
    let fake = Arc::new(FakeBilling::default());
    let (status, body) = post_json(
        router(fake.clone()),
        "/api/daily-bills/range",
        json!({ "cookie": "c", "startDate": "2024-12-01", "endDate": "2024-12-03" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["2024-12-01", "2024-12-02", "2024-12-03"]);
    assert_eq!(fake.calls.lock().await.len(), 3);
}

#[tokio::test]
async fn test_apikey_rows_serialize_camel_case() {
    let fake = Arc::new(FakeBilling::default());
    let (_, body) = post_json(
        router(fake),
        "/api/monthly-bills-apikey",
        json!({ "cookie": "c", "month": "2024-12" }),
    )
    .await;
    assert_eq!(body[0]["name"], "Playground");
    assert_eq!(body[0]["isDisabled"], false);
    assert_eq!(body[0]["llmTokens"], 3);
    assert_eq!(body[0]["imageTokens"], "0");
}

// =============================================================================
// Error mapping
// =============================================================================

#[tokio::test]
async fn test_session_expired_is_401() {
    let fake = FakeBilling::failing(BillingError::SessionExpired).await;
    let (status, body) = post_json(
        router(fake),
        "/api/daily-bills",
        json!({ "cookie": "c", "date": "2024-12-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("Cookie"));
}

#[tokio::test]
async fn test_upstream_error_uses_upstream_code_and_message() {
    let fake = FakeBilling::failing(BillingError::Upstream {
        code: Some(403),
        message: "account frozen".to_string(),
    })
    .await;
    let (status, body) = post_json(
        router(fake),
        "/api/monthly-bills-model",
        json!({ "cookie": "c", "month": "2024-12" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("account frozen"));
}

#[tokio::test]
async fn test_malformed_upstream_is_generic_500() {
    let fake =
        FakeBilling::failing(BillingError::Malformed("line item 3: missing field".into())).await;
    let (status, body) = post_json(
        router(fake),
        "/api/monthly-bills-apikey",
        json!({ "cookie": "c", "month": "2024-12" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to fetch bill data");
}

#[tokio::test]
async fn test_health() {
    let app = router(Arc::new(FakeBilling::default()));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
}

// =============================================================================
// End to end against a mock upstream
// =============================================================================

fn live_router(upstream: &MockServer) -> Router {
    let config = Config {
        legacy_base_url: upstream.uri(),
        tenant_base_url: upstream.uri(),
        ..Config::default()
    };
    let state = AppState::from_config(&config).unwrap();
    build_router(state, config.request_timeout())
}

#[tokio::test]
async fn test_end_to_end_daily_report() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/redirect/bill"))
        .and(query_param("action", "invoices/day_cost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "ok": true,
            "data": { "results": [
                { "subType": "chat", "modelName": "A", "tokens": "120 tokens", "unitAmount": "0.01", "amount": "1.20" },
                { "subType": "chat", "modelName": "A", "tokens": "30 tokens", "unitAmount": "0.02", "amount": "0.30" },
                { "subType": "embedding", "modelName": "B", "tokens": "50 tokens", "unitAmount": "0.005", "amount": "0.25" }
            ] }
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, body) = post_json(
        live_router(&upstream),
        "/api/daily-bills",
        json!({ "cookie": "session=1", "date": "2024-12-01" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["type"], "chat");
    assert_eq!(body[0]["totalTokens"], 150);
    assert_eq!(body[0]["models"][0]["unitPrice"], "0.01");
    assert_eq!(body[1]["type"], "embedding");
    assert_eq!(body[1]["models"][0]["tokens"], 50);
}

#[tokio::test]
async fn test_end_to_end_login_marker_inside_broken_json() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/redirect/bill"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"请重新登录"#))
        .mount(&upstream)
        .await;

    let (status, _) = post_json(
        live_router(&upstream),
        "/api/monthly-bills-model",
        json!({ "cookie": "session=1", "month": "2024-12" }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
