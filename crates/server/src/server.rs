//! HTTP router and server lifecycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use stats_billing::{BillingApi, BillingService, UpstreamClient};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::config::Config;
use crate::handlers;

/// Shared application state.
///
/// Holds no per-user data: cookies arrive with each request.
#[derive(Clone)]
pub struct AppState {
    /// Report backend.
    pub billing: Arc<dyn BillingApi>,
    /// Longest span accepted by the range report.
    pub max_range_days: u32,
}

impl AppState {
    /// State backed by the live upstream described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream URLs are invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoints = config.endpoints().context("Invalid upstream configuration")?;
        let client = UpstreamClient::new(endpoints).context("Failed to build upstream client")?;
        Ok(Self {
            billing: Arc::new(BillingService::new(client)),
            max_range_days: config.max_range_days,
        })
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/daily-bills", post(handlers::daily_bills))
        .route("/api/daily-bills/range", post(handlers::daily_bills_range))
        .route("/api/monthly-bills-model", post(handlers::monthly_bills_model))
        .route(
            "/api/monthly-bills-model/detail",
            post(handlers::monthly_bills_model_detail),
        )
        .route("/api/monthly-bills-apikey", post(handlers::monthly_bills_apikey))
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the state cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn run(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = build_router(state, config.request_timeout());

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(
        %addr,
        legacy = %config.legacy_base_url,
        tenant = %config.tenant_base_url,
        "Stats server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stats server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
