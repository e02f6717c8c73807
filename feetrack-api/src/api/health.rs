//! Liveness endpoint

use axum::Json;
use serde_json::{json, Value};

/// GET /health (no authentication)
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "feetrack-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
