//! Candidate API endpoints, addressed by natural key.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult, Listing};
use crate::errors::AppError;
use crate::models::{Candidate, CreateCandidateRequest, UpdateCandidateRequest};
use crate::AppState;

/// GET /api/candidates - List all candidates.
pub async fn list_candidates(State(state): State<AppState>) -> ApiResult<Listing<Candidate>> {
    let candidates = state.repo.list_candidates().await?;
    success(Listing::new(candidates))
}

/// GET /api/candidates/:idNumber - Get a single candidate.
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id_number): Path<String>,
) -> ApiResult<Candidate> {
    match state.repo.get_candidate(&id_number).await? {
        Some(candidate) => success(candidate),
        None => Err(AppError::NotFound(format!(
            "Candidate {} not found",
            id_number
        ))),
    }
}

/// POST /api/candidates - Create a new candidate.
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(request): Json<CreateCandidateRequest>,
) -> ApiResult<Candidate> {
    let candidate = state.repo.create_candidate(request).await?;
    tracing::info!("Candidate {} registered ({})", candidate.id_number, candidate.status());
    success(candidate)
}

/// PUT /api/candidates/:idNumber - Update a candidate.
pub async fn update_candidate(
    State(state): State<AppState>,
    Path(id_number): Path<String>,
    Json(request): Json<UpdateCandidateRequest>,
) -> ApiResult<Candidate> {
    let candidate = state.repo.update_candidate(&id_number, request).await?;
    success(candidate)
}

/// DELETE /api/candidates/:idNumber - Delete a candidate.
pub async fn delete_candidate(
    State(state): State<AppState>,
    Path(id_number): Path<String>,
) -> ApiResult<Candidate> {
    let removed = state.repo.delete_candidate(&id_number).await?;
    tracing::info!("Candidate {} deleted", removed.id_number);
    success(removed)
}
