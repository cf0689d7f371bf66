//! Sales views: dashboard, periods, rankings and user reconciliation

use axum::extract::{Query, State};
use axum::Json;
use erpboard_client::Resource;
use erpboard_core::periods::PeriodBucket;
use erpboard_core::ranking::RankEntry;
use erpboard_core::reports;
use erpboard_core::users::Reconciliation;
use erpboard_core::DashboardReport;
use serde::Deserialize;

use super::AsOfQuery;
use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

/// Everything the dashboard page shows, under the active filters
pub async fn api_dashboard(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<Json<DashboardReport>> {
    {
        let store = state.dashboard.store().await;
        if let Some(err) = store.state().fatal_error() {
            return Err(err.into());
        }
    }
    Ok(Json(state.dashboard.report(query.today()).await))
}

pub async fn api_periods(State(state): State<AppState>) -> ApiResult<Json<Vec<PeriodBucket>>> {
    let store = state.dashboard.store().await;
    store.state().require(Resource::Invoices)?;
    Ok(Json(reports::periods(store.state())))
}

pub async fn api_vendors(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ApiResult<Json<Vec<RankEntry>>> {
    let limit = query.limit.unwrap_or(state.dashboard.settings().top_n);
    let store = state.dashboard.store().await;
    store.state().require(Resource::Invoices)?;
    Ok(Json(reports::vendors(store.state(), limit)))
}

pub async fn api_clients(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ApiResult<Json<Vec<RankEntry>>> {
    let limit = query.limit.unwrap_or(state.dashboard.settings().top_n);
    let store = state.dashboard.store().await;
    store.state().require(Resource::Invoices)?;
    Ok(Json(reports::clients(store.state(), limit)))
}

pub async fn api_payment_methods(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RankEntry>>> {
    let store = state.dashboard.store().await;
    store.state().require(Resource::Invoices)?;
    Ok(Json(reports::payment_methods(store.state())))
}

/// Vendor totals before and after merging duplicate users
pub async fn api_reconciliation(State(state): State<AppState>) -> ApiResult<Json<Reconciliation>> {
    let store = state.dashboard.store().await;
    store.state().require(Resource::Invoices)?;
    Ok(Json(reports::reconciliation(store.state())))
}
