//! Whole-document endpoints used by the sync coordinator.

use axum::{extract::State, Json};
use serde_json::Value;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{SyncReceipt, SyncSnapshot};
use crate::AppState;

/// GET /api/data - Get the full document.
pub async fn get_data(State(state): State<AppState>) -> ApiResult<SyncSnapshot> {
    let document = state.repo.get_document().await?;
    success(document)
}

/// POST /api/data - Replace the full document.
pub async fn replace_data(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<SyncReceipt> {
    if !body.get("candidates").is_some_and(Value::is_array) {
        return Err(AppError::BadRequest(
            "Invalid data: \"candidates\" must be a list".to_string(),
        ));
    }

    let document: SyncSnapshot = serde_json::from_value(body)?;
    let last_sync = state.repo.replace_document(document).await?;
    success(SyncReceipt { last_sync })
}
