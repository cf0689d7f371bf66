//! Aggregation, normalization and application state for the ERP dashboards

pub mod cache;
pub mod error;
pub mod filters;
pub mod lookup;
pub mod models;
pub mod normalize;
pub mod periods;
pub mod preferences;
pub mod ranking;
pub mod reports;
pub mod services;
pub mod state;
pub mod time;
pub mod tyc;
pub mod users;

use chrono::NaiveDate;
use erpboard_client::ErpClient;
use erpboard_config::Config;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

pub use error::{CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use filters::Filters;
pub use models::{Id, Invoice, PurchaseDelivery, Reference};
pub use normalize::NormalizationRules;
pub use preferences::{PreferenceStore, Preferences, Theme};
pub use reports::{AnalyticsSettings, DashboardReport};
pub use services::{DataLoader, LoadReport, RecordService};
pub use state::{Action, DashboardState, Health, Store};
pub use time::YearMonth;
pub use tyc::{TycAnalysisService, TycMatrix, TycRequest};

/// Store reference type
pub type StoreRef = Arc<RwLock<Store>>;

// ==================== Dashboard ====================

/// The services of one running instance, built once at start
pub struct Dashboard {
    store: StoreRef,
    loader: DataLoader,
    tyc: TycAnalysisService,
    preferences: PreferenceStore,
    settings: AnalyticsSettings,
}

impl Dashboard {
    /// Wire services from config; saved preferences are restored
    pub fn new(client: ErpClient, config: &Config) -> Self {
        let preferences = PreferenceStore::from_config(&config.preferences);
        let store = Store::new(preferences.load());
        let records = RecordService::new(
            client.clone(),
            NormalizationRules::from_config(&config.normalization),
        );

        Self {
            store: Arc::new(RwLock::new(store)),
            loader: DataLoader::from_config(client, config),
            tyc: TycAnalysisService::from_config(records, &config.tyc),
            preferences,
            settings: AnalyticsSettings::from_config(config),
        }
    }

    /// Refetch every dashboard resource and drop cached TyC matrices
    pub async fn reload(&self) -> LoadReport {
        self.tyc.invalidate();
        self.loader.load_all(&self.store).await
    }

    pub async fn store(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().await
    }

    pub fn store_ref(&self) -> StoreRef {
        Arc::clone(&self.store)
    }

    /// Apply a user action, persisting preferences when they change
    pub async fn dispatch(&self, action: Action) -> CoreResult<()> {
        match &action {
            Action::SetFilters(filters)
            | Action::RestorePreferences(Preferences { filters, .. }) => filters.validate()?,
            _ => {}
        }
        let persist = action.touches_preferences();

        let preferences = {
            let mut store = self.store.write().await;
            store.dispatch(action);
            store.state().preferences.clone()
        };

        if persist {
            self.preferences.save(&preferences)?;
        }
        Ok(())
    }

    /// Dashboard report for the active filters
    pub async fn report(&self, today: NaiveDate) -> DashboardReport {
        reports::build_dashboard(self.store.read().await.state(), &self.settings, today)
    }

    pub fn tyc(&self) -> &TycAnalysisService {
        &self.tyc
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    pub fn preference_store(&self) -> &PreferenceStore {
        &self.preferences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpboard_client::{MemoryTransport, Resource};
    use serde_json::json;

    fn config(name: &str) -> Config {
        let mut config = Config::default();
        config.fetch.base_delay_ms = 1;
        config.fetch.max_delay_ms = 2;
        config.preferences.dir =
            std::env::temp_dir().join(format!("erpboard-dashboard-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&config.preferences.dir);
        config
    }

    fn client() -> ErpClient {
        let transport = MemoryTransport::new()
            .with_records(
                Resource::Invoices,
                vec![
                    json!({ "eje": 2024, "mes": 3, "tot": 100 }),
                    json!({ "eje": 2024, "mes": 3, "tot": 50 }),
                    json!({ "eje": 2024, "mes": 4, "tot": 200 }),
                ],
            )
            .with_records(Resource::PurchaseDeliveries, vec![])
            .with_records(Resource::Contacts, vec![])
            .with_records(Resource::Users, vec![])
            .with_records(Resource::Companies, vec![])
            .with_records(Resource::PaymentMethods, vec![]);
        ErpClient::new(Arc::new(transport), 100, 3)
    }

    #[tokio::test]
    async fn test_reload_and_report() {
        let dashboard = Dashboard::new(client(), &config("report"));
        let report = dashboard.reload().await;
        assert_eq!(report.health, Health::Ready);

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let dashboard_report = dashboard.report(today).await;
        assert_eq!(dashboard_report.periods.len(), 2);
        assert_eq!(
            dashboard_report.sales_trend.unwrap().variation_label(),
            "+33.3%"
        );
    }

    #[tokio::test]
    async fn test_preferences_survive_restart() {
        let config = config("persist");
        let dashboard = Dashboard::new(client(), &config);
        dashboard
            .dispatch(Action::SetFilters(Filters {
                year: Some(2024),
                ..Filters::default()
            }))
            .await
            .unwrap();
        dashboard.dispatch(Action::SetTheme(Theme::Dark)).await.unwrap();

        let restarted = Dashboard::new(client(), &config);
        let store = restarted.store().await;
        assert_eq!(store.state().filters().year, Some(2024));
        assert_eq!(store.state().preferences.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_invalid_filters_are_rejected() {
        let dashboard = Dashboard::new(client(), &config("invalid"));
        let err = dashboard
            .dispatch(Action::SetFilters(Filters {
                month_to: Some(14),
                ..Filters::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert!(dashboard.store().await.state().filters().is_empty());
    }
}
