//! Chart-ready reports computed from the state under the active filters

use chrono::NaiveDate;
use erpboard_config::Config;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::filters::Filters;
use crate::lookup::NameMap;
use crate::models::{Id, PurchaseDelivery};
use crate::periods::{aggregate_periods, compute_trend, group_by_month, margin_pct, PeriodBucket, Trend};
use crate::ranking::{self, RankEntry};
use crate::state::{DashboardState, Health};
use crate::users::{reconcile, Reconciliation};

/// Knobs for report building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsSettings {
    pub top_n: usize,
    /// Day of month before which the current month counts as partial
    pub cutoff_day: Option<u32>,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AnalyticsSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_n: config.ranking.top_items_count,
            cutoff_day: config.trends.partial_month_cutoff_day,
        }
    }
}

// ==================== Dashboard ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub sales_total: Decimal,
    pub sales_count: usize,
    pub purchases_total: Decimal,
    pub purchases_count: usize,
    pub balance: Decimal,
    pub margin_pct: Option<f64>,
    /// Mean invoice total
    pub average_ticket: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub as_of: NaiveDate,
    pub filters: Filters,
    pub health: Health,
    pub totals: Totals,
    pub periods: Vec<PeriodBucket>,
    pub sales_trend: Option<Trend>,
    pub purchases_trend: Option<Trend>,
    pub top_vendors: Vec<RankEntry>,
    pub top_clients: Vec<RankEntry>,
    pub top_suppliers: Vec<RankEntry>,
    pub payment_methods: Vec<RankEntry>,
}

/// Build the full dashboard for the active filters
pub fn build_dashboard(
    state: &DashboardState,
    settings: &AnalyticsSettings,
    today: NaiveDate,
) -> DashboardReport {
    let invoices = state.filtered_invoices();
    let purchases = state.filtered_purchases();

    let sales_series = group_by_month(invoices.iter().copied());
    let purchase_series = group_by_month(purchases.iter().copied());

    let sales_total: Decimal = invoices.iter().map(|i| i.total).sum();
    let purchases_total: Decimal = purchases.iter().map(|p| p.total).sum();
    let average_ticket = if invoices.is_empty() {
        Decimal::ZERO
    } else {
        (sales_total / Decimal::from(invoices.len() as u64)).round_dp(2)
    };

    DashboardReport {
        as_of: today,
        filters: state.filters().clone(),
        health: state.health(),
        totals: Totals {
            sales_total,
            sales_count: invoices.len(),
            purchases_total,
            purchases_count: purchases.len(),
            balance: sales_total - purchases_total,
            margin_pct: margin_pct(sales_total, purchases_total),
            average_ticket,
        },
        periods: aggregate_periods(invoices.iter().copied(), purchases.iter().copied()),
        sales_trend: compute_trend(&sales_series, today, settings.cutoff_day),
        purchases_trend: compute_trend(&purchase_series, today, settings.cutoff_day),
        top_vendors: vendors(state, settings.top_n),
        top_clients: clients(state, settings.top_n),
        top_suppliers: ranking::top_suppliers(
            purchases.iter().copied(),
            &state.names.contacts,
            settings.top_n,
        ),
        payment_methods: payment_methods(state),
    }
}

/// Sales versus purchases per month
pub fn periods(state: &DashboardState) -> Vec<PeriodBucket> {
    aggregate_periods(state.filtered_invoices(), state.filtered_purchases())
}

/// Top vendors, duplicate users merged
pub fn vendors(state: &DashboardState, top_n: usize) -> Vec<RankEntry> {
    ranking::top_vendors(
        state.filtered_invoices(),
        &state.consolidation,
        &state.names.users,
        top_n,
    )
}

pub fn clients(state: &DashboardState, top_n: usize) -> Vec<RankEntry> {
    ranking::top_clients(state.filtered_invoices(), &state.names.contacts, top_n)
}

pub fn payment_methods(state: &DashboardState) -> Vec<RankEntry> {
    ranking::payment_method_breakdown(state.filtered_invoices(), &state.names.payment_methods)
}

/// Raw versus consolidated vendor totals under the active filters
pub fn reconciliation(state: &DashboardState) -> Reconciliation {
    reconcile(state.filtered_invoices(), &state.consolidation)
}

// ==================== Supplier Summary ====================

/// Purchasing summary for one supplier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierSummary {
    pub supplier_id: Id,
    pub name: String,
    pub total: Decimal,
    pub count: usize,
    pub average: Decimal,
    pub share_pct: f64,
    pub first_delivery: Option<NaiveDate>,
    pub last_delivery: Option<NaiveDate>,
    /// Distinct delivery-note series, sorted
    pub series: Vec<String>,
}

#[derive(Default)]
struct SupplierExtent {
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
    series: BTreeSet<String>,
}

/// Every supplier, largest purchase total first
pub fn supplier_summary<'a>(
    purchases: impl IntoIterator<Item = &'a PurchaseDelivery> + Clone,
    contacts: &NameMap,
) -> Vec<SupplierSummary> {
    let mut extents: HashMap<Id, SupplierExtent> = HashMap::new();
    for purchase in purchases.clone() {
        let Some(supplier) = purchase.supplier else { continue };
        let extent = extents.entry(supplier).or_default();
        if let Some(date) = purchase.date {
            extent.first = Some(extent.first.map_or(date, |d| d.min(date)));
            extent.last = Some(extent.last.map_or(date, |d| d.max(date)));
        }
        if let Some(series) = &purchase.series {
            extent.series.insert(series.clone());
        }
    }

    ranking::top_suppliers(purchases, contacts, usize::MAX)
        .into_iter()
        .map(|entry| {
            let extent = extents.remove(&entry.id).unwrap_or_default();
            SupplierSummary {
                supplier_id: entry.id,
                name: entry.name,
                total: entry.total,
                count: entry.count,
                average: entry.average,
                share_pct: entry.share_pct,
                first_delivery: extent.first,
                last_delivery: extent.last,
                series: extent.series.into_iter().collect(),
            }
        })
        .collect()
}

/// Supplier summary under the active filters
pub fn suppliers(state: &DashboardState) -> Vec<SupplierSummary> {
    let purchases = state.filtered_purchases();
    supplier_summary(purchases.iter().copied(), &state.names.contacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Invoice, Reference};
    use crate::state::{Action, FetchTicket, Payload, Store};
    use crate::time::YearMonth;
    use erpboard_client::Resource;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(period: YearMonth, total: i64, vendor: Id, client: Id, payment: Id) -> Invoice {
        Invoice {
            id: None,
            period,
            date: None,
            total: Decimal::from(total),
            client: Some(client),
            vendor: Some(vendor),
            payment_method: Some(payment),
        }
    }

    fn purchase(period: YearMonth, total: i64, supplier: Id, day: u32, series: &str) -> PurchaseDelivery {
        PurchaseDelivery {
            id: None,
            period,
            date: Some(date(period.year, period.month, day)),
            total: Decimal::from(total),
            supplier: Some(supplier),
            series: Some(series.to_string()),
        }
    }

    fn load(store: &mut Store, resource: Resource, payload: Payload) {
        let ticket: FetchTicket = store.begin_fetch(resource);
        store.dispatch(Action::FetchSucceeded {
            ticket,
            payload,
            rejected: 0,
            attempts: 1,
        });
    }

    fn loaded_store() -> Store {
        let mut store = Store::default();
        load(
            &mut store,
            Resource::Invoices,
            Payload::Invoices(vec![
                sale(ym(2024, 3), 100, 12, 1, 1),
                sale(ym(2024, 3), 50, 5, 2, 2),
                sale(ym(2024, 4), 200, 7, 1, 1),
            ]),
        );
        load(
            &mut store,
            Resource::PurchaseDeliveries,
            Payload::Purchases(vec![
                purchase(ym(2024, 3), 60, 9, 10, "A"),
                purchase(ym(2024, 4), 40, 9, 2, "B"),
                purchase(ym(2024, 4), 30, 8, 5, "A"),
            ]),
        );
        load(
            &mut store,
            Resource::Users,
            Payload::References(vec![
                Reference::new(5, "Ana"),
                Reference::new(12, "Ana"),
                Reference::new(7, "Luis"),
            ]),
        );
        for resource in [Resource::Contacts, Resource::Companies, Resource::PaymentMethods] {
            load(&mut store, resource, Payload::References(vec![Reference::new(9, "Oro SA")]));
        }
        store
    }

    #[test]
    fn test_dashboard_totals_and_rankings() {
        let store = loaded_store();
        let report = build_dashboard(store.state(), &AnalyticsSettings::default(), date(2024, 6, 1));

        assert_eq!(report.health, Health::Ready);
        assert_eq!(report.totals.sales_total, Decimal::from(350));
        assert_eq!(report.totals.purchases_total, Decimal::from(130));
        assert_eq!(report.totals.balance, Decimal::from(220));
        assert_eq!(report.totals.average_ticket, Decimal::new(11667, 2));
        assert_eq!(report.periods.len(), 2);

        let trend = report.sales_trend.unwrap();
        assert!((trend.variation_pct.unwrap() - 33.333).abs() < 0.01);

        assert_eq!(report.top_vendors[0].id, 7);
        assert_eq!(report.top_vendors[1].id, 5);
        assert_eq!(report.top_vendors[1].total, Decimal::from(150));
        assert_eq!(report.top_vendors[1].name, "Ana");
        assert_eq!(report.top_suppliers[0].name, "Oro SA");
        assert_eq!(report.payment_methods.len(), 2);
    }

    #[test]
    fn test_filters_narrow_every_view() {
        let mut store = loaded_store();
        store.dispatch(Action::SetFilters(Filters {
            month_from: Some(4),
            ..Filters::default()
        }));
        let report = build_dashboard(store.state(), &AnalyticsSettings::default(), date(2024, 6, 1));
        assert_eq!(report.totals.sales_total, Decimal::from(200));
        assert_eq!(report.totals.purchases_total, Decimal::from(70));
        assert!(report.sales_trend.is_none());

        assert!(reconciliation(store.state()).balanced);
    }

    #[test]
    fn test_supplier_summary_extents() {
        let store = loaded_store();
        let summary = suppliers(store.state());

        assert_eq!(summary.len(), 2);
        let oro = &summary[0];
        assert_eq!(oro.supplier_id, 9);
        assert_eq!(oro.count, 2);
        assert_eq!(oro.average, Decimal::from(50));
        assert_eq!(oro.first_delivery, Some(date(2024, 3, 10)));
        assert_eq!(oro.last_delivery, Some(date(2024, 4, 2)));
        assert_eq!(oro.series, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(summary[1].name, "8");
    }
}
