//! Domain services over the ERP client
//!
//! [`RecordService`] fetches and normalizes one resource.
//! [`DataLoader`] fills the dashboard store: every dashboard resource is
//! fetched concurrently with retry, and each completion is dispatched on
//! its own, so one failing resource never blocks the others.

use erpboard_client::{retry_with_backoff, ClientError, ErpClient, Query, Resource, RetryOutcome, RetryPolicy};
use erpboard_config::Config;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::models::{Invoice, PurchaseDelivery, Reference};
use crate::normalize::{normalize_records, FromRecord, NormalizationRules, Normalized};
use crate::state::{Action, Health, Payload, Store};

// ==================== Record Service ====================

/// Fetches every page of a resource and normalizes it
#[derive(Clone)]
pub struct RecordService {
    client: ErpClient,
    rules: NormalizationRules,
}

impl RecordService {
    pub fn new(client: ErpClient, rules: NormalizationRules) -> Self {
        Self { client, rules }
    }

    pub async fn fetch<T: FromRecord>(
        &self,
        resource: Resource,
        query: &Query,
    ) -> Result<Normalized<T>, ClientError> {
        let collection = self.client.fetch_all(resource, query).await?;
        Ok(normalize_records(resource, &collection.items, &self.rules))
    }
}

// ==================== Data Loader ====================

/// Outcome of loading one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub resource: Resource,
    pub ok: bool,
    pub attempts: u32,
    pub records: usize,
    pub rejected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a full reload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub resources: Vec<ResourceReport>,
    pub health: Health,
}

impl LoadReport {
    pub fn failed(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources.iter().filter(|r| !r.ok)
    }
}

/// Loads every dashboard resource into a [`Store`]
#[derive(Clone)]
pub struct DataLoader {
    records: RecordService,
    policy: RetryPolicy,
}

impl DataLoader {
    pub fn new(records: RecordService, policy: RetryPolicy) -> Self {
        Self { records, policy }
    }

    pub fn from_config(client: ErpClient, config: &Config) -> Self {
        Self::new(
            RecordService::new(client, NormalizationRules::from_config(&config.normalization)),
            RetryPolicy::from_config(&config.fetch),
        )
    }

    /// Fetch all dashboard resources concurrently
    pub async fn load_all(&self, store: &RwLock<Store>) -> LoadReport {
        log::info!(target: "erpboard::loader", "Loading dashboard data");

        let (invoices, purchases, contacts, users, companies, payment_methods) = tokio::join!(
            self.load::<Invoice>(store, Resource::Invoices, Payload::Invoices),
            self.load::<PurchaseDelivery>(store, Resource::PurchaseDeliveries, Payload::Purchases),
            self.load::<Reference>(store, Resource::Contacts, Payload::References),
            self.load::<Reference>(store, Resource::Users, Payload::References),
            self.load::<Reference>(store, Resource::Companies, Payload::References),
            self.load::<Reference>(store, Resource::PaymentMethods, Payload::References),
        );

        let health = store.read().await.state().health();
        match &health {
            Health::Fatal { failed_attempts } => log::error!(
                target: "erpboard::loader",
                "Sales and purchases unavailable after {} attempts",
                failed_attempts
            ),
            Health::Error { unavailable } | Health::Degraded { unavailable } => log::warn!(
                target: "erpboard::loader",
                "Loaded with unavailable resources: {:?}",
                unavailable
            ),
            _ => log::info!(target: "erpboard::loader", "Dashboard data ready"),
        }

        LoadReport {
            resources: vec![invoices, purchases, contacts, users, companies, payment_methods],
            health,
        }
    }

    /// Fetch one resource with retry and dispatch the completion
    pub async fn load<T: FromRecord>(
        &self,
        store: &RwLock<Store>,
        resource: Resource,
        wrap: fn(Vec<T>) -> Payload,
    ) -> ResourceReport {
        let ticket = store.write().await.begin_fetch(resource);
        let query = Query::new();

        let outcome = retry_with_backoff(&self.policy, resource.name(), |_| {
            self.records.fetch::<T>(resource, &query)
        })
        .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                let records = value.records.len();
                let rejected = value.rejected.len();
                store.write().await.dispatch(Action::FetchSucceeded {
                    ticket,
                    payload: wrap(value.records),
                    rejected,
                    attempts,
                });
                ResourceReport {
                    resource,
                    ok: true,
                    attempts,
                    records,
                    rejected,
                    error: None,
                }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                let message = last_error.to_string();
                if resource.is_critical() {
                    log::error!(target: "erpboard::loader", "{} unavailable: {}", resource, message);
                } else {
                    log::warn!(
                        target: "erpboard::loader",
                        "{} unavailable, names fall back to ids: {}",
                        resource,
                        message
                    );
                }
                store.write().await.dispatch(Action::FetchFailed {
                    ticket,
                    message: message.clone(),
                    attempts,
                });
                ResourceReport {
                    resource,
                    ok: false,
                    attempts,
                    records: 0,
                    rejected: 0,
                    error: Some(message),
                }
            }
        }
    }
}
