//! HTTP API
//!
//! ```text
//! POST   /api/analyze              run one analysis
//! POST   /api/generate-code        accessible fix for one issue
//! GET    /api/monitors             list monitors
//! POST   /api/monitors             create a monitor
//! GET    /api/monitors/:id         monitor with history
//! DELETE /api/monitors/:id         remove a monitor
//! POST   /api/monitors/:id/check   analyze now and record the result
//! GET    /health                   liveness
//! GET    /status                   counters and latency
//! ```

pub mod analyze;
pub mod generate;
pub mod monitors;
pub mod status;

pub use status::{AnalysisGuard, AppState, HealthResponse, LatencyMetrics, MemoryMetrics, StatusResponse};

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::cors::cors_layer;
use crate::error::{Error, NavigationError};
use crate::pipeline::AnalysisOutcome;

/// An [`Error`] rendered as an HTTP response with an `ErrorResponse` body
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::MonitorNotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            Error::AnalysisTimeout(_) | Error::Navigation(NavigationError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Enrichment(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0.to_response())).into_response()
    }
}

/// Run one analysis under the server's concurrency limit
pub(crate) async fn run_analysis(state: &AppState, url: &str) -> Result<AnalysisOutcome, ApiError> {
    let _permit = state
        .limiter()
        .acquire()
        .await
        .map_err(|_| Error::Unavailable("analysis queue closed".to_string()))?;

    let guard = state.begin();
    let result = state.analyzer().analyze(url).await;
    guard.finish(result.is_ok());

    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            warn!("Analysis of {} failed: {}", url, e);
            Err(ApiError(e))
        }
    }
}

/// Full application router with CORS
pub fn router(state: Arc<AppState>) -> Router {
    info!("Building HTTP router");
    Router::new()
        .route("/health", get(status::health_handler))
        .route("/status", get(status::status_handler))
        .route("/api/analyze", post(analyze::analyze_handler))
        .route("/api/generate-code", post(generate::generate_code_handler))
        .route(
            "/api/monitors",
            get(monitors::list_monitors).post(monitors::create_monitor),
        )
        .route(
            "/api/monitors/:id",
            get(monitors::get_monitor).delete(monitors::delete_monitor),
        )
        .route("/api/monitors/:id/check", post(monitors::check_monitor))
        .layer(cors_layer())
        .with_state(state)
}
