use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::infra::app_state::AppState;

pub async fn ping_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "listener": state.listener.as_str(),
        "clients": state.websocket_manager.connection_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
