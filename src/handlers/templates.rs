//! Lure template handlers

use axum::{extract::State, Json};
use validator::Validate;

use crate::error::is_unique_violation;
use crate::models::{CreateTemplate, EmailTemplate};
use crate::{AppError, AppResult, AppState};

/// List the template catalog
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<EmailTemplate>>> {
    let templates = EmailTemplate::list(&state.pool).await?;
    Ok(Json(templates))
}

/// Create a template. The slug is derived from the name; a clash means a
/// template with that name already exists.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateTemplate>,
) -> AppResult<Json<EmailTemplate>> {
    req.validate()?;

    match EmailTemplate::create(&state.pool, req).await {
        Ok(template) => {
            tracing::info!(slug = %template.slug, "template created");
            Ok(Json(template))
        }
        Err(err) if is_unique_violation(&err) => Err(AppError::AlreadyExists(
            "A template with that name already exists".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}
