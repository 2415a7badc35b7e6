use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version plus which document provider is active and how often it has degraded.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "provider": {
            "kind": state.intelligence.kind().as_str(),
            "degraded_calls": state.intelligence.degraded_calls(),
        }
    }))
}
