//! Health check handler

use axum::Json;
use serde_json::{json, Value};

pub async fn check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "kinetis-cloud",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
