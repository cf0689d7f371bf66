//! ERP REST API client
//!
//! A thin HTTP layer that adds the API key, builds `filter[...]` and
//! `page[...]` query strings and walks every page of a list endpoint.
//! Retrying is left to callers through [`retry::retry_with_backoff`].

use async_trait::async_trait;
use std::sync::Arc;

pub mod client;
pub mod error;
pub mod memory;
pub mod query;
pub mod retry;
pub mod schema;
pub mod transport;

pub use client::{ErpClient, FetchedCollection, Page};
pub use error::ClientError;
pub use memory::MemoryTransport;
pub use query::Query;
pub use retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
pub use schema::Resource;
pub use transport::HttpTransport;

// ==================== Transport Trait ====================

/// Transport reference type
pub type TransportRef = Arc<dyn ErpTransport>;

/// Issues a single GET against the ERP API and returns the decoded body.
#[async_trait]
pub trait ErpTransport: Send + Sync {
    /// `path` is relative to the API base URL (e.g. `/fac_t`)
    async fn get(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ClientError>;
}
