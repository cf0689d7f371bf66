//! Size/color matrix

use axum::extract::{Query, State};
use axum::Json;
use erpboard_core::{TycMatrix, TycRequest};

use crate::{ApiResult, AppState};

/// `?article=&color=&family=`; results are cached per request
pub async fn api_tyc(
    State(state): State<AppState>,
    Query(request): Query<TycRequest>,
) -> ApiResult<Json<TycMatrix>> {
    let matrix = state.dashboard.tyc().analyze(&request).await?;
    Ok(Json(matrix.as_ref().clone()))
}
