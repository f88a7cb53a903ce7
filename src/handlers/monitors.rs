//! Monitor endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::browser::normalize_url;
use crate::error::{ConfigError, Error};
use crate::handlers::{run_analysis, ApiError, AppState};
use crate::monitor::{Monitor, MonitorCheck};

const DEFAULT_SCHEDULE: &str = "daily";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMonitorRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub check_result: MonitorCheck,
    pub monitor: Monitor,
}

/// `GET /api/monitors`
#[instrument(skip_all)]
pub async fn list_monitors(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Monitor>>, ApiError> {
    Ok(Json(state.monitors().list().await?))
}

/// `POST /api/monitors`
#[instrument(skip_all)]
pub async fn create_monitor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMonitorRequest>,
) -> Result<(StatusCode, Json<Monitor>), ApiError> {
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(ApiError(ConfigError::MissingUrl.into()))?;
    let url = normalize_url(&url)?;
    let schedule = request
        .schedule
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SCHEDULE.to_string());

    let monitor = state.monitors().create(url, schedule, request.webhook_url).await?;
    info!("Created {} for {}", monitor.id, monitor.url);
    Ok((StatusCode::CREATED, Json(monitor)))
}

/// `GET /api/monitors/:id`
#[instrument(skip(state))]
pub async fn get_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Monitor>, ApiError> {
    let monitor = state
        .monitors()
        .get(&id)
        .await?
        .ok_or(Error::MonitorNotFound(id))?;
    Ok(Json(monitor))
}

/// `DELETE /api/monitors/:id`
#[instrument(skip(state))]
pub async fn delete_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.monitors().remove(&id).await? {
        info!("Removed {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::MonitorNotFound(id).into())
    }
}

/// `POST /api/monitors/:id/check`
#[instrument(skip(state))]
pub async fn check_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CheckResponse>, ApiError> {
    let monitor = state
        .monitors()
        .get(&id)
        .await?
        .ok_or_else(|| Error::MonitorNotFound(id.clone()))?;

    let outcome = run_analysis(&state, &monitor.url).await?;
    let check = MonitorCheck::from_report(&outcome.report);

    // the monitor may have been removed while the analysis ran
    let monitor = state
        .monitors()
        .record(&id, check.clone())
        .await?
        .ok_or(Error::MonitorNotFound(id))?;

    Ok(Json(CheckResponse {
        check_result: check,
        monitor,
    }))
}
