//! JSON API server for the erpboard dashboards
//!
//! Routes are organized into modules:
//! - routes::status: health, load status, reload
//! - routes::sales: dashboard, periods, rankings, user reconciliation
//! - routes::purchases: supplier summary
//! - routes::tyc: size/color matrix
//! - routes::preferences: filters, theme and export format
//! - routes::export: CSV/XLSX downloads
//! - routes::settings: configuration display

pub mod error;
pub mod routes;

use axum::http::{header, Method};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use erpboard_config::Config;
use erpboard_core::Dashboard;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

pub use error::{ApiError, ApiResult};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(dashboard: Dashboard, config: Config) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
            config: Arc::new(config),
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::export::api_export;
    use routes::preferences::{api_clear_filters, api_preferences, api_set_filters, api_set_preferences};
    use routes::purchases::api_suppliers;
    use routes::sales::{
        api_clients, api_dashboard, api_payment_methods, api_periods, api_reconciliation,
        api_vendors,
    };
    use routes::settings::api_settings;
    use routes::status::{api_health, api_reload, api_status};
    use routes::tyc::api_tyc;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/status", get(api_status))
        .route("/api/reload", post(api_reload))
        .route("/api/dashboard", get(api_dashboard))
        .route("/api/sales/periods", get(api_periods))
        .route("/api/sales/vendors", get(api_vendors))
        .route("/api/sales/clients", get(api_clients))
        .route("/api/sales/payment-methods", get(api_payment_methods))
        .route("/api/purchases/suppliers", get(api_suppliers))
        .route("/api/users/reconciliation", get(api_reconciliation))
        .route("/api/tyc", get(api_tyc))
        .route("/api/preferences", get(api_preferences))
        .route("/api/preferences", put(api_set_preferences))
        .route("/api/filters", put(api_set_filters))
        .route("/api/filters", delete(api_clear_filters))
        .route("/api/export/:dataset", get(api_export))
        .route("/api/settings", get(api_settings))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Bind the configured address and serve until the process stops
pub async fn start_server(state: AppState) -> std::io::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!(target: "erpboard::api", "Starting erpboard server on http://{}", addr);
    log::info!(target: "erpboard::api", "Dashboard at http://{}/api/dashboard", addr);

    axum::serve(listener, router).await?;
    log::info!(target: "erpboard::api", "Server stopped");
    Ok(())
}
