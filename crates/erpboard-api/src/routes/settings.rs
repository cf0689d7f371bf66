//! Settings API endpoints

use axum::extract::State;
use axum::Json;

use crate::AppState;

/// Active configuration. `erp.api_key` is never serialized.
pub async fn api_settings(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(state.config.as_ref()).unwrap_or_default())
}
