//! Log API endpoints.

use axum::{extract::State, Json};

use super::{success, ApiResult, Listing};
use crate::models::{AppendLogRequest, LogEntry};
use crate::AppState;

/// GET /api/logs - List all log entries.
pub async fn list_logs(State(state): State<AppState>) -> ApiResult<Listing<LogEntry>> {
    let logs = state.repo.list_logs().await?;
    success(Listing::new(logs))
}

/// POST /api/logs - Append a log entry.
pub async fn append_log(
    State(state): State<AppState>,
    Json(request): Json<AppendLogRequest>,
) -> ApiResult<LogEntry> {
    let entry = state.repo.append_log(request).await?;
    success(entry)
}
