//! GET /health - liveness probe, no auth required.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.chat_service.provider_name(),
        "sessions": state.chat_service.store().session_count(),
    }))
}
