//! Purchasing views

use axum::extract::State;
use axum::Json;
use erpboard_client::Resource;
use erpboard_core::reports::{self, SupplierSummary};

use crate::{ApiResult, AppState};

/// Every supplier under the active filters, largest first
pub async fn api_suppliers(State(state): State<AppState>) -> ApiResult<Json<Vec<SupplierSummary>>> {
    let store = state.dashboard.store().await;
    store.state().require(Resource::PurchaseDeliveries)?;
    Ok(Json(reports::suppliers(store.state())))
}
