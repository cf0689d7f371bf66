//! Health, load status and reload

use axum::extract::State;
use axum::Json;
use erpboard_client::Resource;
use erpboard_core::state::SlotMeta;
use erpboard_core::{ErrorDetails, Health, LoadReport};
use serde::Serialize;

use crate::AppState;

pub async fn api_health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct ResourceStatus {
    pub resource: Resource,
    #[serde(flatten)]
    pub meta: SlotMeta,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub health: Health,
    pub resources: Vec<ResourceStatus>,
    /// Present when nothing can be shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    pub tyc_cache_entries: usize,
}

/// Per-resource loading state
pub async fn api_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let store = state.dashboard.store().await;
    let current = store.state();

    let resources = Resource::DASHBOARD
        .iter()
        .filter_map(|r| {
            current.datasets.meta(*r).map(|meta| ResourceStatus {
                resource: *r,
                meta: meta.clone(),
            })
        })
        .collect();

    Json(StatusResponse {
        health: current.health(),
        resources,
        error: current.fatal_error().map(|e| e.to_details()),
        tyc_cache_entries: state.dashboard.tyc().cached_entries(),
    })
}

/// Refetch everything from the ERP
pub async fn api_reload(State(state): State<AppState>) -> Json<LoadReport> {
    log::info!(target: "erpboard::api", "Reload requested");
    Json(state.dashboard.reload().await)
}
