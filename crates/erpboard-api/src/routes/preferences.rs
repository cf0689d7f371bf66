//! Persisted preferences: filters, theme and export format

use axum::extract::State;
use axum::Json;
use erpboard_core::{Action, Filters, Preferences};

use crate::{ApiResult, AppState};

pub async fn api_preferences(State(state): State<AppState>) -> Json<Preferences> {
    let store = state.dashboard.store().await;
    Json(store.state().preferences.clone())
}

/// Replace all preferences
pub async fn api_set_preferences(
    State(state): State<AppState>,
    Json(preferences): Json<Preferences>,
) -> ApiResult<Json<Preferences>> {
    state
        .dashboard
        .dispatch(Action::RestorePreferences(preferences))
        .await?;
    Ok(api_preferences(State(state)).await)
}

/// Replace the active filters
pub async fn api_set_filters(
    State(state): State<AppState>,
    Json(filters): Json<Filters>,
) -> ApiResult<Json<Preferences>> {
    state.dashboard.dispatch(Action::SetFilters(filters)).await?;
    Ok(api_preferences(State(state)).await)
}

pub async fn api_clear_filters(State(state): State<AppState>) -> ApiResult<Json<Preferences>> {
    state.dashboard.dispatch(Action::ClearFilters).await?;
    Ok(api_preferences(State(state)).await)
}
