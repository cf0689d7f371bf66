//! Error types for erpboard-export

use erpboard_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV export failed: {message}")]
    Csv { message: String },

    #[error("XLSX export failed: {message}")]
    Xlsx { message: String },

    #[error("Cannot write {path}: {message}")]
    Io { path: String, message: String },

    #[error("Unknown dataset: {name}")]
    UnknownDataset { name: String },

    #[error("Nothing to export for {dataset}: {reason}")]
    Unavailable { dataset: String, reason: String },

    /// The source resource is not loaded or failed to load
    #[error(transparent)]
    Data(#[from] CoreError),
}

impl From<csv::Error> for ExportError {
    fn from(error: csv::Error) -> Self {
        ExportError::Csv {
            message: error.to_string(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Xlsx {
            message: error.to_string(),
        }
    }
}

/// Result type with ExportError
pub type ExportResult<T> = Result<T, ExportError>;
