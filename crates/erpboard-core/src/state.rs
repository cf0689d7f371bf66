//! Application state and its reducer
//!
//! All mutations go through [`reduce`]. Each fetch is issued a
//! [`FetchTicket`] carrying the resource's generation at the time it
//! started; completions with an older generation are discarded so a slow,
//! superseded fetch can never overwrite fresher data.

use chrono::{DateTime, Utc};
use erpboard_client::Resource;
use erpboard_config::ExportFormat;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::filters::Filters;
use crate::lookup::{NameMap, NameMaps};
use crate::models::{Invoice, PurchaseDelivery, Reference};
use crate::preferences::{Preferences, Theme};
use crate::users::UserConsolidation;

// ==================== Resource Slots ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Loading bookkeeping for one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotMeta {
    pub status: LoadStatus,
    pub error: Option<String>,
    pub generation: u64,
    /// Attempts used by the last completed fetch
    pub attempts: u32,
    pub records: usize,
    pub rejected: usize,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Default for SlotMeta {
    fn default() -> Self {
        Self {
            status: LoadStatus::Idle,
            error: None,
            generation: 0,
            attempts: 0,
            records: 0,
            rejected: 0,
            fetched_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSlot<T> {
    pub meta: SlotMeta,
    pub data: Vec<T>,
}

impl<T> Default for ResourceSlot<T> {
    fn default() -> Self {
        Self {
            meta: SlotMeta::default(),
            data: Vec::new(),
        }
    }
}

/// Everything fetched for the dashboard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub invoices: ResourceSlot<Invoice>,
    pub purchases: ResourceSlot<PurchaseDelivery>,
    pub contacts: ResourceSlot<Reference>,
    pub users: ResourceSlot<Reference>,
    pub companies: ResourceSlot<Reference>,
    pub payment_methods: ResourceSlot<Reference>,
}

impl Datasets {
    pub fn meta(&self, resource: Resource) -> Option<&SlotMeta> {
        match resource {
            Resource::Invoices => Some(&self.invoices.meta),
            Resource::PurchaseDeliveries => Some(&self.purchases.meta),
            Resource::Contacts => Some(&self.contacts.meta),
            Resource::Users => Some(&self.users.meta),
            Resource::Companies => Some(&self.companies.meta),
            Resource::PaymentMethods => Some(&self.payment_methods.meta),
            _ => None,
        }
    }

    fn meta_mut(&mut self, resource: Resource) -> Option<&mut SlotMeta> {
        match resource {
            Resource::Invoices => Some(&mut self.invoices.meta),
            Resource::PurchaseDeliveries => Some(&mut self.purchases.meta),
            Resource::Contacts => Some(&mut self.contacts.meta),
            Resource::Users => Some(&mut self.users.meta),
            Resource::Companies => Some(&mut self.companies.meta),
            Resource::PaymentMethods => Some(&mut self.payment_methods.meta),
            _ => None,
        }
    }

    fn references_mut(&mut self, resource: Resource) -> Option<&mut ResourceSlot<Reference>> {
        match resource {
            Resource::Contacts => Some(&mut self.contacts),
            Resource::Users => Some(&mut self.users),
            Resource::Companies => Some(&mut self.companies),
            Resource::PaymentMethods => Some(&mut self.payment_methods),
            _ => None,
        }
    }
}

// ==================== Actions ====================

/// Proof that a fetch was started at a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchTicket {
    pub resource: Resource,
    pub generation: u64,
}

/// Records delivered by a completed fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Invoices(Vec<Invoice>),
    Purchases(Vec<PurchaseDelivery>),
    References(Vec<Reference>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Invoices(v) => v.len(),
            Payload::Purchases(v) => v.len(),
            Payload::References(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    FetchStarted {
        resource: Resource,
    },
    FetchSucceeded {
        ticket: FetchTicket,
        payload: Payload,
        rejected: usize,
        attempts: u32,
    },
    FetchFailed {
        ticket: FetchTicket,
        message: String,
        attempts: u32,
    },
    SetFilters(Filters),
    ClearFilters,
    SetTheme(Theme),
    SetExportFormat(ExportFormat),
    RestorePreferences(Preferences),
}

impl Action {
    /// True when the action changes persisted preferences
    pub fn touches_preferences(&self) -> bool {
        matches!(
            self,
            Action::SetFilters(_)
                | Action::ClearFilters
                | Action::SetTheme(_)
                | Action::SetExportFormat(_)
                | Action::RestorePreferences(_)
        )
    }
}

// ==================== State ====================

/// Overall data availability
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Health {
    Loading,
    Ready,
    /// Reference data missing; names fall back to ids
    Degraded { unavailable: Vec<Resource> },
    /// One critical dataset failed
    Error { unavailable: Vec<Resource> },
    /// Sales and purchases both failed
    Fatal { failed_attempts: u32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub datasets: Datasets,
    pub preferences: Preferences,
    pub names: NameMaps,
    pub consolidation: UserConsolidation,
}

impl DashboardState {
    pub fn with_preferences(preferences: Preferences) -> Self {
        Self {
            preferences,
            ..Self::default()
        }
    }

    pub fn filters(&self) -> &Filters {
        &self.preferences.filters
    }

    /// Sales matching the active filters
    pub fn filtered_invoices(&self) -> Vec<&Invoice> {
        let filters = self.filters();
        self.datasets
            .invoices
            .data
            .iter()
            .filter(|i| filters.matches_invoice(i, &self.consolidation))
            .collect()
    }

    /// Purchases matching the active filters
    pub fn filtered_purchases(&self) -> Vec<&PurchaseDelivery> {
        let filters = self.filters();
        self.datasets
            .purchases
            .data
            .iter()
            .filter(|p| filters.matches_purchase(p))
            .collect()
    }

    pub fn health(&self) -> Health {
        let failed: Vec<Resource> = Resource::DASHBOARD
            .iter()
            .copied()
            .filter(|r| self.status_of(*r) == LoadStatus::Failed)
            .collect();
        let critical: Vec<Resource> = failed.iter().copied().filter(|r| r.is_critical()).collect();

        if critical.len() == 2 {
            let failed_attempts = critical
                .iter()
                .filter_map(|r| self.datasets.meta(*r))
                .map(|m| m.attempts)
                .sum();
            return Health::Fatal { failed_attempts };
        }
        if !critical.is_empty() {
            return Health::Error { unavailable: critical };
        }
        let loading = Resource::DASHBOARD
            .iter()
            .any(|r| matches!(self.status_of(*r), LoadStatus::Idle | LoadStatus::Loading));
        if loading {
            return Health::Loading;
        }
        if !failed.is_empty() {
            return Health::Degraded { unavailable: failed };
        }
        Health::Ready
    }

    /// The page-level error when the dashboard cannot show anything
    pub fn fatal_error(&self) -> Option<CoreError> {
        match self.health() {
            Health::Fatal { failed_attempts } => Some(CoreError::DataUnavailable { failed_attempts }),
            _ => None,
        }
    }

    /// Ok once `resource` holds fetched data
    pub fn require(&self, resource: Resource) -> CoreResult<()> {
        let Some(meta) = self.datasets.meta(resource) else {
            return Err(CoreError::NotLoaded { resource });
        };
        match meta.status {
            LoadStatus::Ready => Ok(()),
            LoadStatus::Loading if meta.fetched_at.is_some() => Ok(()),
            LoadStatus::Failed => Err(CoreError::ResourceUnavailable {
                resource,
                attempts: meta.attempts,
                message: meta.error.clone().unwrap_or_default(),
            }),
            LoadStatus::Idle | LoadStatus::Loading => Err(CoreError::NotLoaded { resource }),
        }
    }

    fn status_of(&self, resource: Resource) -> LoadStatus {
        self.datasets
            .meta(resource)
            .map(|m| m.status)
            .unwrap_or(LoadStatus::Idle)
    }

    fn rebuild_reference(&mut self, resource: Resource) {
        match resource {
            Resource::Contacts => {
                self.names.contacts = NameMap::from_references(&self.datasets.contacts.data)
            }
            Resource::Users => {
                self.names.users = NameMap::from_references(&self.datasets.users.data);
                self.consolidation = UserConsolidation::build(&self.datasets.users.data);
            }
            Resource::Companies => {
                self.names.companies = NameMap::from_references(&self.datasets.companies.data)
            }
            Resource::PaymentMethods => {
                self.names.payment_methods =
                    NameMap::from_references(&self.datasets.payment_methods.data)
            }
            _ => {}
        }
    }
}

/// Apply `action` to `state`
pub fn reduce(mut state: DashboardState, action: Action) -> DashboardState {
    match action {
        Action::FetchStarted { resource } => {
            if let Some(meta) = state.datasets.meta_mut(resource) {
                meta.generation += 1;
                meta.status = LoadStatus::Loading;
                meta.error = None;
            }
        }
        Action::FetchSucceeded {
            ticket,
            payload,
            rejected,
            attempts,
        } => {
            if !is_current(&state, &ticket) {
                return state;
            }
            let records = payload.len();
            let stored = match (ticket.resource, payload) {
                (Resource::Invoices, Payload::Invoices(data)) => {
                    state.datasets.invoices.data = data;
                    true
                }
                (Resource::PurchaseDeliveries, Payload::Purchases(data)) => {
                    state.datasets.purchases.data = data;
                    true
                }
                (resource, Payload::References(data)) => match state.datasets.references_mut(resource) {
                    Some(slot) => {
                        slot.data = data;
                        true
                    }
                    None => false,
                },
                _ => false,
            };
            if !stored {
                log::error!(
                    target: "erpboard::state",
                    "Payload does not match resource {}",
                    ticket.resource
                );
                return state;
            }
            if let Some(meta) = state.datasets.meta_mut(ticket.resource) {
                meta.status = LoadStatus::Ready;
                meta.error = None;
                meta.attempts = attempts;
                meta.records = records;
                meta.rejected = rejected;
                meta.fetched_at = Some(Utc::now());
            }
            state.rebuild_reference(ticket.resource);
        }
        Action::FetchFailed {
            ticket,
            message,
            attempts,
        } => {
            if !is_current(&state, &ticket) {
                return state;
            }
            if let Some(meta) = state.datasets.meta_mut(ticket.resource) {
                meta.status = LoadStatus::Failed;
                meta.error = Some(message);
                meta.attempts = attempts;
            }
        }
        Action::SetFilters(filters) => state.preferences.filters = filters,
        Action::ClearFilters => state.preferences.filters = Filters::default(),
        Action::SetTheme(theme) => state.preferences.theme = theme,
        Action::SetExportFormat(format) => state.preferences.export_format = format,
        Action::RestorePreferences(preferences) => state.preferences = preferences,
    }
    state
}

fn is_current(state: &DashboardState, ticket: &FetchTicket) -> bool {
    let current = state.datasets.meta(ticket.resource).map(|m| m.generation);
    if current != Some(ticket.generation) {
        log::debug!(
            target: "erpboard::state",
            "Discarding stale {} completion (generation {} vs {:?})",
            ticket.resource,
            ticket.generation,
            current
        );
        return false;
    }
    true
}

// ==================== Store ====================

/// Owner of the state; the only place actions are applied
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: DashboardState,
}

impl Store {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            state: DashboardState::with_preferences(preferences),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    /// Mark `resource` as loading and return the ticket its completion
    /// must present
    pub fn begin_fetch(&mut self, resource: Resource) -> FetchTicket {
        self.dispatch(Action::FetchStarted { resource });
        FetchTicket {
            resource,
            generation: self
                .state
                .datasets
                .meta(resource)
                .map(|m| m.generation)
                .unwrap_or_default(),
        }
    }
}
