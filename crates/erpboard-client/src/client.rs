//! Paginated list fetching

use erpboard_config::Config;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::{ClientError, ErpTransport, HttpTransport, Query, Resource, TransportRef};

/// Guard for servers that never report a total and never return a
/// short page.
const MAX_PAGES: usize = 10_000;

/// One decoded page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Total records across all pages, when the server reports it
    pub total: Option<usize>,
}

/// Every record of a resource, concatenated across pages
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedCollection {
    pub resource: Resource,
    pub items: Vec<Value>,
    /// Number of records actually received
    pub count: usize,
    pub pages: usize,
}

/// Client for the ERP list endpoints
#[derive(Clone)]
pub struct ErpClient {
    transport: TransportRef,
    page_size: usize,
    page_batch_size: usize,
}

impl ErpClient {
    pub fn new(transport: TransportRef, page_size: usize, page_batch_size: usize) -> Self {
        Self {
            transport,
            page_size: page_size.max(1),
            page_batch_size: page_batch_size.max(1),
        }
    }

    /// Build a client talking HTTP to the configured ERP
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let transport = HttpTransport::from_config(&config.erp)?;
        Ok(Self::new(
            Arc::new(transport),
            config.erp.page_size,
            config.fetch.page_batch_size,
        ))
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch a single page (1-based)
    pub async fn fetch_page(
        &self,
        resource: Resource,
        query: &Query,
        page_number: usize,
    ) -> Result<Page, ClientError> {
        fetch_page_with(&self.transport, resource, query, self.page_size, page_number).await
    }

    /// Fetch every page of `resource` matching `query`.
    ///
    /// Page 1 is requested alone to learn the total and the page length the
    /// server actually honours; the remaining pages go out in batches of up
    /// to `page_batch_size` concurrent requests until the total is reached
    /// or a page comes back empty.
    pub async fn fetch_all(
        &self,
        resource: Resource,
        query: &Query,
    ) -> Result<FetchedCollection, ClientError> {
        let first = self.fetch_page(resource, query, 1).await?;
        let first_len = first.items.len();
        let mut items = first.items;
        let mut pages = 1;

        match first.total {
            Some(total) => {
                // The server may cap page[size] below what was asked for.
                let observed = first_len.max(1);
                let mut last_len = first_len;
                let mut next = 2;
                while items.len() < total && last_len > 0 && pages < MAX_PAGES {
                    let wanted = (total - items.len()).div_ceil(observed);
                    let last = next + wanted.min(self.page_batch_size) - 1;
                    let batch = self.fetch_batch(resource, query, next..=last).await?;
                    pages += batch.len();
                    for (_, page) in batch {
                        if last_len > 0 {
                            last_len = page.len();
                            items.extend(page);
                        }
                    }
                    next = last + 1;
                }
                if items.len() < total {
                    log::warn!(
                        target: "erpboard::client",
                        "{}: server reported {} records but only {} arrived",
                        resource,
                        total,
                        items.len()
                    );
                }
            }
            None => {
                let observed = first_len;
                let mut last_len = first_len;
                while last_len > 0 && last_len == observed && pages < MAX_PAGES {
                    let page = self.fetch_page(resource, query, pages + 1).await?;
                    pages += 1;
                    last_len = page.items.len();
                    items.extend(page.items);
                }
                if pages >= MAX_PAGES {
                    log::warn!(
                        target: "erpboard::client",
                        "{}: stopped after {} pages without a reported total",
                        resource,
                        MAX_PAGES
                    );
                }
            }
        }

        let count = items.len();
        log::info!(
            target: "erpboard::client",
            "{}: fetched {} records in {} page(s)",
            resource,
            count,
            pages
        );

        Ok(FetchedCollection {
            resource,
            items,
            count,
            pages,
        })
    }

    async fn fetch_batch(
        &self,
        resource: Resource,
        query: &Query,
        page_numbers: std::ops::RangeInclusive<usize>,
    ) -> Result<Vec<(usize, Vec<Value>)>, ClientError> {
        let mut set = JoinSet::new();
        for page_number in page_numbers {
            let transport = Arc::clone(&self.transport);
            let query = query.clone();
            let page_size = self.page_size;
            set.spawn(async move {
                fetch_page_with(&transport, resource, &query, page_size, page_number)
                    .await
                    .map(|page| (page_number, page.items))
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            let page = joined.map_err(|e| ClientError::Internal {
                message: format!("page task failed: {}", e),
            })??;
            results.push(page);
        }
        results.sort_by_key(|(page_number, _)| *page_number);
        Ok(results)
    }
}

async fn fetch_page_with(
    transport: &TransportRef,
    resource: Resource,
    query: &Query,
    page_size: usize,
    page_number: usize,
) -> Result<Page, ClientError> {
    let params = query.to_params(page_size, page_number);
    let body = transport.get(&resource.path(), &params).await?;
    parse_page(resource, body)
}

/// Decode a list response using the resource's declared field
pub fn parse_page(resource: Resource, body: Value) -> Result<Page, ClientError> {
    let Value::Object(mut map) = body else {
        return Err(ClientError::InvalidShape {
            resource: resource.to_string(),
            message: "expected a JSON object".to_string(),
        });
    };

    let items = match map.remove(resource.field()) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ClientError::InvalidShape {
                resource: resource.to_string(),
                message: format!("field '{}' is {}, not an array", resource.field(), kind(&other)),
            })
        }
        None => {
            return Err(ClientError::MissingField {
                resource: resource.to_string(),
                field: resource.field().to_string(),
            })
        }
    };

    // `total_count` is authoritative; `count` only counts as a total when
    // it exceeds the records on this page.
    let total = match map.get("total_count").and_then(as_count) {
        Some(total) => Some(total),
        None => map
            .get("count")
            .and_then(as_count)
            .filter(|count| *count > items.len()),
    };

    Ok(Page { items, total })
}

fn as_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTransport;
    use serde_json::json;

    fn invoices(n: usize) -> Vec<Value> {
        (1..=n).map(|i| json!({ "id": i, "tot": i * 10 })).collect()
    }

    fn client_with(transport: MemoryTransport, page_size: usize, batch: usize) -> (ErpClient, Arc<MemoryTransport>) {
        let transport = Arc::new(transport);
        let client = ErpClient::new(transport.clone(), page_size, batch);
        (client, transport)
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_pages_in_order() {
        let (client, transport) = client_with(
            MemoryTransport::new().with_records(Resource::Invoices, invoices(23)),
            5,
            2,
        );

        let fetched = client.fetch_all(Resource::Invoices, &Query::new()).await.unwrap();

        assert_eq!(fetched.count, 23);
        assert_eq!(fetched.pages, 5);
        let ids: Vec<u64> = fetched.items.iter().map(|v| v["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, (1..=23).collect::<Vec<u64>>());
        let mut pages = transport.requested_pages(Resource::Invoices);
        pages.sort();
        assert_eq!(pages, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_single_page_needs_one_request() {
        let (client, transport) = client_with(
            MemoryTransport::new().with_records(Resource::Users, invoices(3)),
            100,
            3,
        );
        let fetched = client.fetch_all(Resource::Users, &Query::new()).await.unwrap();
        assert_eq!(fetched.count, 3);
        assert_eq!(transport.request_count(Resource::Users), 1);
    }

    #[tokio::test]
    async fn test_empty_resource() {
        let (client, _) = client_with(
            MemoryTransport::new().with_records(Resource::Users, vec![]),
            10,
            3,
        );
        let fetched = client.fetch_all(Resource::Users, &Query::new()).await.unwrap();
        assert_eq!(fetched.count, 0);
        assert!(fetched.items.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_propagated() {
        let (client, _) = client_with(
            MemoryTransport::new()
                .with_records(Resource::Invoices, invoices(3))
                .failing(Resource::Invoices, 1, 401),
            10,
            3,
        );
        let err = client.fetch_all(Resource::Invoices, &Query::new()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_missing_field_fails_loudly() {
        let (client, _) = client_with(MemoryTransport::new().malformed(Resource::Contacts), 10, 3);
        let err = client.fetch_all(Resource::Contacts, &Query::new()).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::MissingField {
                resource: "contacts".to_string(),
                field: "ent_m".to_string(),
            }
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_parse_page_without_total_count() {
        let page = parse_page(Resource::Users, json!({ "usr_m": [{"id": 1}], "count": 1 })).unwrap();
        assert_eq!(page.total, None);

        let page = parse_page(Resource::Users, json!({ "usr_m": [{"id": 1}], "count": "40" })).unwrap();
        assert_eq!(page.total, Some(40));
    }

    #[test]
    fn test_parse_page_rejects_non_array_field() {
        let err = parse_page(Resource::Users, json!({ "usr_m": {"id": 1} })).unwrap_err();
        assert!(matches!(err, ClientError::InvalidShape { .. }));
    }

    #[tokio::test]
    async fn test_unknown_total_stops_on_short_page() {
        use async_trait::async_trait;

        /// Server that never reports totals
        struct NoTotals(MemoryTransport);

        #[async_trait]
        impl ErpTransport for NoTotals {
            async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, ClientError> {
                let mut body = self.0.get(path, params).await?;
                if let Value::Object(map) = &mut body {
                    map.remove("total_count");
                    map.remove("count");
                }
                Ok(body)
            }
        }

        let inner = MemoryTransport::new().with_records(Resource::Invoices, invoices(7));
        let client = ErpClient::new(Arc::new(NoTotals(inner)), 3, 2);
        let fetched = client.fetch_all(Resource::Invoices, &Query::new()).await.unwrap();
        assert_eq!(fetched.count, 7);
        assert_eq!(fetched.pages, 3);
    }

    #[tokio::test]
    async fn test_server_page_cap_still_reaches_total() {
        let (client, transport) = client_with(
            MemoryTransport::new()
                .with_records(Resource::Invoices, invoices(10))
                .with_max_page_size(3),
            5,
            2,
        );

        let fetched = client.fetch_all(Resource::Invoices, &Query::new()).await.unwrap();

        assert_eq!(fetched.count, 10);
        assert_eq!(fetched.pages, 4);
        let ids: Vec<u64> = fetched.items.iter().map(|v| v["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<u64>>());
        let mut pages = transport.requested_pages(Resource::Invoices);
        pages.sort();
        assert_eq!(pages, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_total_beyond_served_records_stops_on_empty_page() {
        use async_trait::async_trait;

        /// Server that overstates its totals
        struct Inflated(MemoryTransport);

        #[async_trait]
        impl ErpTransport for Inflated {
            async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, ClientError> {
                let mut body = self.0.get(path, params).await?;
                body["total_count"] = json!(50);
                Ok(body)
            }
        }

        let inner = MemoryTransport::new().with_records(Resource::Invoices, invoices(4));
        let client = ErpClient::new(Arc::new(Inflated(inner)), 2, 2);
        let fetched = client.fetch_all(Resource::Invoices, &Query::new()).await.unwrap();
        assert_eq!(fetched.count, 4);
    }
}
