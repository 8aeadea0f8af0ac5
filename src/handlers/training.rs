//! Remediation handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Target, TargetStatus};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CompleteTrainingRequest {
    pub target_id: Uuid,
}

/// Mark a clicked target as trained. Idempotent: repeating the call on an
/// already-trained target is a success no-op.
pub async fn complete(
    State(state): State<AppState>,
    Json(req): Json<CompleteTrainingRequest>,
) -> AppResult<Json<Target>> {
    if let Some(updated) = Target::complete_training(&state.pool, req.target_id).await? {
        tracing::info!(target_id = %updated.id, "target completed training");
        return Ok(Json(updated));
    }

    // The CAS did not fire: distinguish replay from invalid transition
    let target = Target::find_by_id(&state.pool, req.target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Target not found".to_string()))?;

    match target.status() {
        Some(TargetStatus::Trained) => Ok(Json(target)),
        _ => Err(AppError::StateConflict(
            "Target has not clicked yet".to_string(),
        )),
    }
}
