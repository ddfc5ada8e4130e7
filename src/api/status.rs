//! Health and maintenance endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth;
use crate::errors::AppError;
use crate::models::ServerStatus;
use crate::AppState;

/// Request body for POST /api/reset.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetOutcome {
    pub message: String,
}

/// GET /api/status - Server health and document counts.
pub async fn get_status(State(state): State<AppState>) -> ApiResult<ServerStatus> {
    let status = state.repo.status().await?;
    success(status)
}

/// POST /api/reset - Wipe the document back to defaults.
pub async fn reset_data(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> ApiResult<ResetOutcome> {
    if !auth::verify_reset_password(&request.password, &state.config.reset_password) {
        tracing::warn!("Rejected reset attempt with a wrong password");
        return Err(AppError::Forbidden("Incorrect reset password".to_string()));
    }

    state.repo.reset().await?;
    success(ResetOutcome {
        message: "Data reset to defaults".to_string(),
    })
}
