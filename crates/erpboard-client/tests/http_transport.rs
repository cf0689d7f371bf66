//! Runs the reqwest transport against an in-process fake ERP server.

use axum::extract::Query as AxumQuery;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use erpboard_client::{ErpClient, HttpTransport, Query, Resource};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const API_KEY: &str = "secret";
const TOTAL: usize = 12;

async fn invoices(AxumQuery(params): AxumQuery<HashMap<String, String>>) -> impl IntoResponse {
    if params.get("api_key").map(String::as_str) != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid api key" })),
        );
    }

    let size: usize = params.get("page[size]").and_then(|v| v.parse().ok()).unwrap_or(TOTAL);
    let number: usize = params.get("page[number]").and_then(|v| v.parse().ok()).unwrap_or(1);
    let year = params.get("filter[eje]").cloned();

    let rows: Vec<_> = (1..=TOTAL)
        .map(|id| json!({ "id": id, "eje": 2024, "mes": 1 + (id % 12), "tot": id * 5 }))
        .filter(|row| year.as_deref().map_or(true, |y| row["eje"].to_string() == y))
        .collect();
    let total = rows.len();
    let page: Vec<_> = rows.into_iter().skip((number - 1) * size).take(size).collect();

    (
        StatusCode::OK,
        Json(json!({ "fac_t": page, "count": page.len(), "total_count": total })),
    )
}

async fn spawn_server() -> String {
    let app = Router::new().route("/api/fac_t", get(invoices));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn client(base_url: &str, api_key: &str) -> ErpClient {
    let transport =
        HttpTransport::new(base_url, api_key, "api_key", Duration::from_secs(5)).unwrap();
    ErpClient::new(Arc::new(transport), 5, 2)
}

#[tokio::test]
async fn test_paginates_over_http() {
    let base_url = spawn_server().await;
    let fetched = client(&base_url, API_KEY)
        .fetch_all(Resource::Invoices, &Query::new().filter("eje", 2024))
        .await
        .unwrap();

    assert_eq!(fetched.count, TOTAL);
    assert_eq!(fetched.pages, 3);
    assert_eq!(fetched.items[0]["id"], 1);
    assert_eq!(fetched.items[TOTAL - 1]["id"], TOTAL);
}

#[tokio::test]
async fn test_http_status_and_message_surface() {
    let base_url = spawn_server().await;
    let err = client(&base_url, "wrong")
        .fetch_all(Resource::Invoices, &Query::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("invalid api key"));
}
