//! `POST /api/analyze`

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use crate::error::ConfigError;
use crate::handlers::{run_analysis, ApiError, AppState};
use crate::pipeline::AnalysisOutcome;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Analyze the posted URL and return the full outcome
#[instrument(skip_all)]
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(ApiError(ConfigError::MissingUrl.into()))?;
    let outcome = run_analysis(&state, &url).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::pipeline::Analyzer;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn state() -> Arc<AppState> {
        let config = AppConfig {
            enrichment_enabled: false,
            ..AppConfig::default()
        };
        Arc::new(AppState::new(Analyzer::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_missing_url_is_bad_request() {
        let response = analyze_handler(State(state()), Json(AnalyzeRequest::default()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_url_is_bad_request() {
        let state = state();
        let request = AnalyzeRequest {
            url: Some("javascript:alert(1)".into()),
        };
        let response = analyze_handler(State(state.clone()), Json(request))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.analyses_failed(), 1);
    }
}
