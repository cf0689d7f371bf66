//! CSV/XLSX downloads

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use erpboard_config::ExportFormat;
use erpboard_core::{Id, TycRequest};
use erpboard_export::{export_filename, render, tyc_table, Dataset};
use serde::Deserialize;

use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// Falls back to the saved preference
    pub format: Option<ExportFormat>,
    pub as_of: Option<NaiveDate>,
    pub article: Option<Id>,
    pub color: Option<Id>,
    pub family: Option<String>,
}

/// `GET /api/export/:dataset?format=csv|xlsx`
pub async fn api_export(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let dataset: Dataset = dataset.parse()?;

    let (table, format) = if dataset == Dataset::Tyc {
        let request = TycRequest {
            article: query.article,
            color: query.color,
            family: query.family.clone(),
        };
        let matrix = state.dashboard.tyc().analyze(&request).await?;
        let format = match query.format {
            Some(format) => format,
            None => state.dashboard.store().await.state().preferences.export_format,
        };
        (tyc_table(&matrix), format)
    } else {
        let store = state.dashboard.store().await;
        let current = store.state();
        if let Some(err) = current.fatal_error() {
            return Err(err.into());
        }
        let table = dataset.build(current, state.dashboard.settings())?;
        (table, query.format.unwrap_or(current.preferences.export_format))
    };

    let bytes = render(&table, format)?;
    let today = query.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    let filename = export_filename(dataset.name(), format, today);
    log::info!(
        target: "erpboard::api",
        "Export {} as {} ({} row(s))",
        dataset,
        format,
        table.len()
    );

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, bytes).into_response())
}
