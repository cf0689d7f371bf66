//! Error types for erpboard-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use erpboard_core::{CoreError, ErrorCode, ErrorDetails};
use erpboard_export::ExportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Core(e) | ApiError::Export(ExportError::Data(e)) => core_status(e),
            ApiError::Export(e) => match e {
                ExportError::UnknownDataset { .. } => StatusCode::NOT_FOUND,
                ExportError::Unavailable { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Body sent to the client
    pub fn to_details(&self) -> ErrorDetails {
        match self {
            ApiError::NotFound { .. } => ErrorDetails::new(ErrorCode::NotLoaded, self.to_string()),
            ApiError::BadRequest { .. } => {
                ErrorDetails::new(ErrorCode::InvalidRequest, self.to_string())
            }
            ApiError::Core(e) | ApiError::Export(ExportError::Data(e)) => e.to_details(),
            ApiError::Export(ExportError::UnknownDataset { .. }) => {
                ErrorDetails::new(ErrorCode::InvalidRequest, self.to_string()).with_suggestion(
                    "Use one of: periods, vendors, clients, suppliers, payment_methods, invoices, purchases, tyc"
                        .to_string(),
                )
            }
            ApiError::Export(ExportError::Unavailable { .. }) => {
                ErrorDetails::new(ErrorCode::NotLoaded, self.to_string())
            }
            ApiError::Export(_) => ErrorDetails::new(ErrorCode::InternalError, self.to_string()),
        }
    }
}

fn core_status(error: &CoreError) -> StatusCode {
    match error.code() {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotLoaded | ErrorCode::ResourceUnavailable | ErrorCode::DataUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorCode::UpstreamError | ErrorCode::NetworkError | ErrorCode::InvalidPayload => {
            StatusCode::BAD_GATEWAY
        }
        ErrorCode::PersistenceError | ErrorCode::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!(target: "erpboard::api", "{}", self);
        } else {
            log::debug!(target: "erpboard::api", "{}", self);
        }
        (status, Json(self.to_details())).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;
