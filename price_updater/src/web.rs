//! HTTP trigger for price updates
//!
//! `POST /functions/v1/update-card-prices` (or `/update-card-prices`) runs an
//! update and reports its totals. Run logs can be read back under
//! `/api/price-updates`.

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::run_log::RunLogEntry;
use crate::updater::{PriceUpdater, RunReport};

const CORS_HEADERS: [(HeaderName, &str); 2] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        "authorization, x-client-info, apikey, content-type",
    ),
];

/// Shared application state
#[derive(Clone)]
struct AppState {
    updater: Arc<PriceUpdater>,
}

/// Run log query parameters
#[derive(Deserialize)]
struct LogParams {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Body of a completed run (also when some cards failed)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerResponse {
    success: bool,
    message: String,
    updated_count: usize,
    error_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<Vec<String>>,
}

/// Body of a run that could not start
#[derive(Serialize)]
struct TriggerFailure {
    success: bool,
    error: String,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<RunReport> for TriggerResponse {
    fn from(report: RunReport) -> Self {
        let message = report.message();
        let totals = report.totals;
        TriggerResponse {
            success: true,
            message,
            updated_count: totals.updated_count,
            error_count: totals.error_count,
            error_details: if totals.error_details.is_empty() {
                None
            } else {
                Some(totals.error_details)
            },
        }
    }
}

/// OPTIONS - CORS preflight
async fn preflight_handler() -> impl IntoResponse {
    (StatusCode::OK, CORS_HEADERS, "ok")
}

/// POST /functions/v1/update-card-prices
async fn trigger_handler(State(state): State<AppState>) -> Response {
    let updater = Arc::clone(&state.updater);
    // the run lives on its own task; a dropped connection must not cancel it
    let outcome = tokio::spawn(async move { updater.run().await }).await;

    match outcome {
        Ok(Ok(report)) => (
            StatusCode::OK,
            CORS_HEADERS,
            Json(TriggerResponse::from(report)),
        )
            .into_response(),
        Ok(Err(e)) => {
            log::error!("Price update failed: {}", e);
            trigger_failure(e.to_string())
        }
        Err(e) => {
            log::error!("Price update task failed: {}", e);
            trigger_failure(format!("Price update task failed: {}", e))
        }
    }
}

fn trigger_failure(error: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        CORS_HEADERS,
        Json(TriggerFailure {
            success: false,
            error,
        }),
    )
        .into_response()
}

fn api_error(error: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(error),
        }),
    )
        .into_response()
}

/// GET /api/price-updates?limit={limit}
async fn logs_handler(
    State(state): State<AppState>,
    Query(params): Query<LogParams>,
) -> Response {
    match state.updater.store().recent_run_logs(params.limit).await {
        Ok(logs) => Json(ApiResponse {
            success: true,
            data: Some(logs),
            error: None,
        })
        .into_response(),
        Err(e) => {
            log::error!("Error fetching logs: {}", e);
            api_error(e.to_string())
        }
    }
}

/// GET /api/price-updates/latest
async fn latest_log_handler(State(state): State<AppState>) -> Response {
    match state.updater.store().recent_run_logs(1).await {
        Ok(logs) => match logs.into_iter().next() {
            Some(entry) => Json(ApiResponse::<RunLogEntry> {
                success: true,
                data: Some(entry),
                error: None,
            })
            .into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        Err(e) => {
            log::error!("Error fetching last update: {}", e);
            api_error(e.to_string())
        }
    }
}

/// Build the web server router
pub fn create_router(updater: Arc<PriceUpdater>) -> Router {
    let state = AppState { updater };

    Router::new()
        .route(
            "/functions/v1/update-card-prices",
            post(trigger_handler).options(preflight_handler),
        )
        .route(
            "/update-card-prices",
            post(trigger_handler).options(preflight_handler),
        )
        .route("/api/price-updates", get(logs_handler))
        .route("/api/price-updates/latest", get(latest_log_handler))
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
pub async fn serve(updater: Arc<PriceUpdater>, port: u16) -> std::io::Result<()> {
    let app = create_router(updater);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Price update trigger listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
