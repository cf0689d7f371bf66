//! In-memory transport serving canned records with the same paging and
//! filtering rules as the ERP API. Useful for offline runs and tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{ClientError, ErpTransport, Resource};

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Vec<Value>>,
    /// Remaining forced failures per path: (count, status)
    failures: HashMap<String, (usize, u16)>,
    /// Paths whose responses omit the record field
    malformed: Vec<String>,
    /// Every request served, as (path, page number)
    requests: Vec<(String, usize)>,
    /// Largest page served regardless of the requested size
    max_page_size: Option<usize>,
}

#[derive(Debug, Default)]
pub struct MemoryTransport {
    inner: Mutex<Inner>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for `resource`
    pub fn with_records(self, resource: Resource, records: Vec<Value>) -> Self {
        self.lock().tables.insert(resource.path(), records);
        self
    }

    /// Fail the next `times` requests for `resource` with `status`
    pub fn failing(self, resource: Resource, times: usize, status: u16) -> Self {
        self.lock().failures.insert(resource.path(), (times, status));
        self
    }

    /// Answer `resource` requests without its record field
    pub fn malformed(self, resource: Resource) -> Self {
        self.lock().malformed.push(resource.path());
        self
    }

    /// Serve at most `size` records per page, like servers that clamp
    /// `page[size]`
    pub fn with_max_page_size(self, size: usize) -> Self {
        self.lock().max_page_size = Some(size.max(1));
        self
    }

    /// Number of requests served for a resource
    pub fn request_count(&self, resource: Resource) -> usize {
        let path = resource.path();
        self.lock().requests.iter().filter(|(p, _)| *p == path).count()
    }

    /// Page numbers requested for a resource, in request order
    pub fn requested_pages(&self, resource: Resource) -> Vec<usize> {
        let path = resource.path();
        self.lock()
            .requests
            .iter()
            .filter(|(p, _)| *p == path)
            .map(|(_, page)| *page)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn field_matches(record: &Value, field: &str, expected: &str) -> bool {
    match record.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        _ => false,
    }
}

#[async_trait]
impl ErpTransport for MemoryTransport {
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, ClientError> {
        let mut inner = self.lock();

        let page_size: usize = param(params, "page[size]")
            .and_then(|v| v.parse().ok())
            .unwrap_or(usize::MAX)
            .min(inner.max_page_size.unwrap_or(usize::MAX));
        let page_number: usize = param(params, "page[number]")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        inner.requests.push((path.to_string(), page_number));

        if let Some((remaining, status)) = inner.failures.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::Http {
                    status: *status,
                    resource: path.to_string(),
                    message: "simulated failure".to_string(),
                });
            }
        }

        let field = path.trim_start_matches('/');
        if inner.malformed.iter().any(|p| p == path) {
            return Ok(json!({ "unexpected": [], "count": 0 }));
        }

        let filters: Vec<(&str, &str)> = params
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("filter[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .map(|f| (f, value.as_str()))
            })
            .collect();

        let records: Vec<&Value> = inner
            .tables
            .get(path)
            .map(|rows| {
                rows.iter()
                    .filter(|r| filters.iter().all(|(f, v)| field_matches(r, f, v)))
                    .collect()
            })
            .unwrap_or_default();

        let total = records.len();
        let start = page_size.saturating_mul(page_number.saturating_sub(1));
        let page: Vec<Value> = records
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        let mut body = serde_json::Map::new();
        body.insert("count".to_string(), json!(page.len()));
        body.insert("total_count".to_string(), json!(total));
        body.insert(field.to_string(), Value::Array(page));
        Ok(Value::Object(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: usize, number: usize) -> Vec<(String, String)> {
        vec![
            ("page[size]".to_string(), size.to_string()),
            ("page[number]".to_string(), number.to_string()),
        ]
    }

    #[tokio::test]
    async fn test_pages_and_totals() {
        let records = (1..=5).map(|i| json!({ "id": i })).collect();
        let transport = MemoryTransport::new().with_records(Resource::Users, records);

        let body = transport.get("/usr_m", &params(2, 3)).await.unwrap();
        assert_eq!(body["usr_m"].as_array().unwrap().len(), 1);
        assert_eq!(body["total_count"], 5);
    }

    #[tokio::test]
    async fn test_filters_apply_before_paging() {
        let records = vec![
            json!({ "id": 1, "eje": 2024 }),
            json!({ "id": 2, "eje": 2023 }),
            json!({ "id": 3, "eje": "2024" }),
        ];
        let transport = MemoryTransport::new().with_records(Resource::Invoices, records);
        let mut p = params(10, 1);
        p.push(("filter[eje]".to_string(), "2024".to_string()));

        let body = transport.get("/fac_t", &p).await.unwrap();
        assert_eq!(body["total_count"], 2);
    }

    #[tokio::test]
    async fn test_forced_failures_run_out() {
        let transport = MemoryTransport::new()
            .with_records(Resource::Users, vec![])
            .failing(Resource::Users, 1, 503);

        let first = transport.get("/usr_m", &params(10, 1)).await;
        assert_eq!(first.unwrap_err().status(), Some(503));
        assert!(transport.get("/usr_m", &params(10, 1)).await.is_ok());
        assert_eq!(transport.request_count(Resource::Users), 2);
    }

    #[tokio::test]
    async fn test_max_page_size_clamps_requests() {
        let records = (1..=5).map(|i| json!({ "id": i })).collect();
        let transport = MemoryTransport::new()
            .with_records(Resource::Users, records)
            .with_max_page_size(2);

        let body = transport.get("/usr_m", &params(10, 2)).await.unwrap();
        assert_eq!(body["usr_m"], json!([{ "id": 3 }, { "id": 4 }]));
        assert_eq!(body["total_count"], 5);
    }
}
