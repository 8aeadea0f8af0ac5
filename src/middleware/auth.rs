//! Admin authentication middleware
//!
//! The management surface sits behind one shared API key. Operator
//! identity and sessions live outside this service; the tracking
//! endpoint stays public.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{AppError, AppState};

const API_KEY_HEADER: &str = "x-api-key";

/// Middleware: require the admin API key on management routes
pub async fn require_admin_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == state.config.admin_api_key => Ok(next.run(req).await),
        _ => {
            tracing::warn!("admin request rejected: missing or invalid API key");
            Err(AppError::Unauthorized)
        }
    }
}
