//! Health check endpoint.

use axum::Json;
use serde_json::{json, Value};

/// Liveness probe; no dependencies are touched.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
