//! `POST /api/generate-code`

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::{instrument, warn};

use crate::enrich::{CodeFixRequest, CodeFixResponse};
use crate::error::Error;
use crate::handlers::{ApiError, AppState};

/// Ask the model for an accessible rewrite of the posted markup
#[instrument(skip_all)]
pub async fn generate_code_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CodeFixRequest>,
) -> Result<Json<CodeFixResponse>, ApiError> {
    request.validate()?;
    let generator = state
        .analyzer()
        .code_fixer()
        .ok_or_else(|| Error::Unavailable("code generation needs a model API key".to_string()))?;

    match generator.generate(&request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!("Code generation failed: {}", e);
            Err(ApiError(e))
        }
    }
}
