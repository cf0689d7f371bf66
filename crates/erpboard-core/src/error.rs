//! Error types for erpboard-core
//!
//! Error codes, severities and detailed messages with suggestions for the
//! aggregation layer and the dashboard state.

use erpboard_client::{ClientError, Resource};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Dataset not loaded yet
    NotLoaded,
    /// Upstream answered with an error status
    UpstreamError,
    /// Upstream could not be reached
    NetworkError,
    /// Upstream payload did not match the resource schema
    InvalidPayload,
    /// Resource exhausted its retries
    ResourceUnavailable,
    /// Both critical resources are unavailable
    DataUnavailable,
    /// Invalid filter or request value
    InvalidRequest,
    /// Preference store failure
    PersistenceError,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NotLoaded => write!(f, "NOT_LOADED"),
            ErrorCode::UpstreamError => write!(f, "UPSTREAM_ERROR"),
            ErrorCode::NetworkError => write!(f, "NETWORK_ERROR"),
            ErrorCode::InvalidPayload => write!(f, "INVALID_PAYLOAD"),
            ErrorCode::ResourceUnavailable => write!(f, "RESOURCE_UNAVAILABLE"),
            ErrorCode::DataUnavailable => write!(f, "DATA_UNAVAILABLE"),
            ErrorCode::InvalidRequest => write!(f, "INVALID_REQUEST"),
            ErrorCode::PersistenceError => write!(f, "PERSISTENCE_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - part of the data may be missing
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - the dashboard has no data to show
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for erpboard-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Dataset not loaded: {resource}")]
    NotLoaded { resource: Resource },

    #[error("Upstream error for {resource}: {source}")]
    Fetch {
        resource: Resource,
        #[source]
        source: ClientError,
    },

    #[error("{resource} unavailable after {attempts} attempt(s): {message}")]
    ResourceUnavailable {
        resource: Resource,
        attempts: u32,
        message: String,
    },

    #[error("Sales and purchases are both unavailable")]
    DataUnavailable { failed_attempts: u32 },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Preference store error at {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    /// Wrap a client error for a resource
    pub fn fetch(resource: Resource, source: ClientError) -> Self {
        CoreError::Fetch { resource, source }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::NotLoaded { .. } => ErrorCode::NotLoaded,
            CoreError::Fetch { source, .. } => match source {
                ClientError::Http { .. } => ErrorCode::UpstreamError,
                ClientError::Network { .. } => ErrorCode::NetworkError,
                e if e.is_validation() => ErrorCode::InvalidPayload,
                _ => ErrorCode::InternalError,
            },
            CoreError::ResourceUnavailable { .. } => ErrorCode::ResourceUnavailable,
            CoreError::DataUnavailable { .. } => ErrorCode::DataUnavailable,
            CoreError::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            CoreError::Persistence { .. } => ErrorCode::PersistenceError,
            CoreError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::NotLoaded { .. } => ErrorSeverity::Info,
            CoreError::Fetch { resource, .. } | CoreError::ResourceUnavailable { resource, .. } => {
                if resource.is_critical() {
                    ErrorSeverity::Error
                } else {
                    ErrorSeverity::Warning
                }
            }
            CoreError::DataUnavailable { .. } => ErrorSeverity::Critical,
            CoreError::InvalidRequest { .. } => ErrorSeverity::Info,
            CoreError::Persistence { .. } => ErrorSeverity::Warning,
            CoreError::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::NotLoaded { .. } => {
                details = details.with_suggestion(
                    "Wait for the initial load to finish or POST /api/reload.".to_string(),
                );
            }
            CoreError::Fetch { resource, source } => {
                if let Some(status) = source.status() {
                    details = details.with_detail(serde_json::json!({
                        "resource": resource.name(),
                        "status": status,
                    }));
                }
                if matches!(source.status(), Some(401) | Some(403)) {
                    details = details.with_suggestion(
                        "Check erp.api_key or the ERPBOARD_API_KEY environment variable."
                            .to_string(),
                    );
                }
                if source.is_validation() {
                    details = details.with_suggestion(format!(
                        "The ERP response for {} must contain the '{}' array.",
                        resource.name(),
                        resource.field()
                    ));
                }
            }
            CoreError::ResourceUnavailable {
                resource, attempts, ..
            } => {
                details = details.with_detail(serde_json::json!({
                    "resource": resource.name(),
                    "attempts": attempts,
                }));
                details = details.with_suggestion("Retry with POST /api/reload.".to_string());
            }
            CoreError::DataUnavailable { failed_attempts } => {
                details = details.with_detail(serde_json::json!({
                    "failed_attempts": failed_attempts,
                }));
                details = details
                    .with_suggestion("Check that erp.base_url is reachable.".to_string());
                details = details.with_suggestion("Retry with POST /api/reload.".to_string());
            }
            CoreError::Persistence { path, .. } => {
                details = details.with_suggestion(format!(
                    "Ensure the directory of '{}' exists and is writable.",
                    path
                ));
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

// ==================== Tests ====================
