use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use pit_proto::LogPage;
use serde_json::{json, Value};

use crate::state::FloorState;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn get_logs(State(state): State<Arc<FloorState>>) -> Json<LogPage> {
    Json(state.log_page())
}
