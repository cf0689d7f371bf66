//! Flattening of dashboard views into export tables

use chrono::NaiveDate;
use erpboard_client::Resource;
use erpboard_core::periods::PeriodBucket;
use erpboard_core::ranking::RankEntry;
use erpboard_core::reports::{self, AnalyticsSettings, SupplierSummary};
use erpboard_core::tyc::TycMatrix;
use erpboard_core::DashboardState;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::table::{Cell, ExportTable};

/// Exportable views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Periods,
    Vendors,
    Clients,
    Suppliers,
    PaymentMethods,
    Invoices,
    Purchases,
    Tyc,
}

impl Dataset {
    pub const ALL: [Dataset; 8] = [
        Dataset::Periods,
        Dataset::Vendors,
        Dataset::Clients,
        Dataset::Suppliers,
        Dataset::PaymentMethods,
        Dataset::Invoices,
        Dataset::Purchases,
        Dataset::Tyc,
    ];

    /// Name used in URLs and file names
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Periods => "periods",
            Dataset::Vendors => "vendors",
            Dataset::Clients => "clients",
            Dataset::Suppliers => "suppliers",
            Dataset::PaymentMethods => "payment_methods",
            Dataset::Invoices => "invoices",
            Dataset::Purchases => "purchases",
            Dataset::Tyc => "tyc",
        }
    }

    /// Sheet title
    pub fn title(&self) -> &'static str {
        match self {
            Dataset::Periods => "Sales vs purchases",
            Dataset::Vendors => "Top vendors",
            Dataset::Clients => "Top clients",
            Dataset::Suppliers => "Suppliers",
            Dataset::PaymentMethods => "Payment methods",
            Dataset::Invoices => "Invoices",
            Dataset::Purchases => "Purchases",
            Dataset::Tyc => "Size x color",
        }
    }

    /// Resource the dataset is derived from, `None` for the TyC matrix
    pub fn source(&self) -> Option<Resource> {
        match self {
            Dataset::Periods
            | Dataset::Vendors
            | Dataset::Clients
            | Dataset::PaymentMethods
            | Dataset::Invoices => Some(Resource::Invoices),
            Dataset::Suppliers | Dataset::Purchases => Some(Resource::PurchaseDeliveries),
            Dataset::Tyc => None,
        }
    }

    /// Build the table for a state-backed dataset. The TyC matrix is not
    /// part of the state; use [`tyc_table`] for it.
    ///
    /// Fails while the source resource is not loaded or after it failed,
    /// instead of writing an empty table.
    pub fn build(
        &self,
        state: &DashboardState,
        settings: &AnalyticsSettings,
    ) -> Result<ExportTable, ExportError> {
        if let Some(resource) = self.source() {
            state.require(resource)?;
        }
        let table = match self {
            Dataset::Periods => periods_table(&reports::periods(state)),
            Dataset::Vendors => ranking_table(self.title(), &reports::vendors(state, settings.top_n)),
            Dataset::Clients => ranking_table(self.title(), &reports::clients(state, settings.top_n)),
            Dataset::Suppliers => suppliers_table(&reports::suppliers(state)),
            Dataset::PaymentMethods => {
                ranking_table(self.title(), &reports::payment_methods(state))
            }
            Dataset::Invoices => invoices_table(state),
            Dataset::Purchases => purchases_table(state),
            Dataset::Tyc => {
                return Err(ExportError::Unavailable {
                    dataset: self.name().to_string(),
                    reason: "the TyC matrix is built on request".to_string(),
                })
            }
        };
        log::debug!(target: "erpboard::export", "Built {} table with {} row(s)", self.name(), table.len());
        Ok(table)
    }
}

impl std::str::FromStr for Dataset {
    type Err = ExportError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Dataset::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| ExportError::UnknownDataset { name: s.to_string() })
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ==================== Table Builders ====================

pub fn periods_table(buckets: &[PeriodBucket]) -> ExportTable {
    let mut table = ExportTable::new(
        Dataset::Periods.title(),
        [
            "Period",
            "Sales",
            "Sales count",
            "Purchases",
            "Purchases count",
            "Balance",
            "Margin %",
        ],
    );
    for b in buckets {
        table.push(vec![
            Cell::text(b.period.to_string()),
            b.sales_total.into(),
            b.sales_count.into(),
            b.purchases_total.into(),
            b.purchases_count.into(),
            b.balance.into(),
            Cell::optional(b.margin_pct),
        ]);
    }
    table
}

pub fn ranking_table(title: &str, entries: &[RankEntry]) -> ExportTable {
    let mut table = ExportTable::new(title, ["Id", "Name", "Total", "Count", "Average", "Share %"]);
    for e in entries {
        table.push(vec![
            e.id.into(),
            Cell::text(e.name.clone()),
            e.total.into(),
            e.count.into(),
            e.average.into(),
            e.share_pct.into(),
        ]);
    }
    table
}

pub fn suppliers_table(summary: &[SupplierSummary]) -> ExportTable {
    let mut table = ExportTable::new(
        Dataset::Suppliers.title(),
        [
            "Id",
            "Name",
            "Total",
            "Count",
            "Average",
            "Share %",
            "First delivery",
            "Last delivery",
            "Series",
        ],
    );
    for s in summary {
        table.push(vec![
            s.supplier_id.into(),
            Cell::text(s.name.clone()),
            s.total.into(),
            s.count.into(),
            s.average.into(),
            s.share_pct.into(),
            Cell::optional(s.first_delivery.map(|d| d.to_string())),
            Cell::optional(s.last_delivery.map(|d| d.to_string())),
            Cell::text(s.series.join(", ")),
        ]);
    }
    table
}

fn date_cell(date: Option<NaiveDate>) -> Cell {
    Cell::optional(date.map(|d| d.to_string()))
}

/// Filtered invoices with names resolved
pub fn invoices_table(state: &DashboardState) -> ExportTable {
    let names = &state.names;
    let mut table = ExportTable::new(
        Dataset::Invoices.title(),
        ["Id", "Period", "Date", "Total", "Client", "Vendor", "Payment method"],
    );
    for i in state.filtered_invoices() {
        table.push(vec![
            Cell::optional(i.id),
            Cell::text(i.period.to_string()),
            date_cell(i.date),
            i.total.into(),
            Cell::optional(i.client.map(|id| names.contacts.name_or_id(id))),
            Cell::optional(
                state
                    .consolidation
                    .vendor_of(i)
                    .map(|id| names.users.name_or_id(id)),
            ),
            Cell::optional(i.payment_method.map(|id| names.payment_methods.name_or_id(id))),
        ]);
    }
    table
}

/// Filtered purchase deliveries with supplier names
pub fn purchases_table(state: &DashboardState) -> ExportTable {
    let mut table = ExportTable::new(
        Dataset::Purchases.title(),
        ["Id", "Period", "Date", "Total", "Supplier", "Series"],
    );
    for p in state.filtered_purchases() {
        table.push(vec![
            Cell::optional(p.id),
            Cell::text(p.period.to_string()),
            date_cell(p.date),
            p.total.into(),
            Cell::optional(p.supplier.map(|id| state.names.contacts.name_or_id(id))),
            Cell::optional(p.series.clone()),
        ]);
    }
    table
}

/// One row per article/color: stock per size, sales per size, totals
pub fn tyc_table(matrix: &TycMatrix) -> ExportTable {
    let mut headers = vec!["Article".to_string(), "Color".to_string()];
    headers.extend(matrix.sizes.iter().map(|s| format!("{} stock", s.name)));
    headers.extend(matrix.sizes.iter().map(|s| format!("{} sales", s.name)));
    headers.extend(["Stock", "Sales", "Rotation", "Coverage"].map(String::from));

    let mut table = ExportTable::new(Dataset::Tyc.title(), headers);
    for row in &matrix.rows {
        let mut cells = vec![Cell::text(row.article_name.clone()), Cell::text(row.color_name.clone())];
        cells.extend(row.stock.iter().map(|q| Cell::Number(*q)));
        cells.extend(row.sales.iter().map(|q| Cell::Number(*q)));
        cells.extend([
            Cell::Number(row.total_stock),
            Cell::Number(row.total_sales),
            Cell::Number(row.rotation),
            Cell::Number(row.coverage),
        ]);
        table.push(cells);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpboard_core::models::{Article, Size, StockRow};
    use erpboard_core::state::{Action, Payload, Store};
    use erpboard_core::tyc::{build_matrix, TycInputs};
    use erpboard_core::{ErrorCode, Invoice, Reference, YearMonth};
    use rust_decimal::Decimal;

    fn store() -> Store {
        let mut store = Store::default();
        let ticket = store.begin_fetch(Resource::Invoices);
        store.dispatch(Action::FetchSucceeded {
            ticket,
            payload: Payload::Invoices(vec![Invoice {
                id: Some(1),
                period: YearMonth::new(2024, 3).unwrap(),
                date: NaiveDate::from_ymd_opt(2024, 3, 2),
                total: Decimal::new(12050, 2),
                client: Some(4),
                vendor: Some(12),
                payment_method: None,
            }]),
            rejected: 0,
            attempts: 1,
        });
        let ticket = store.begin_fetch(Resource::Users);
        store.dispatch(Action::FetchSucceeded {
            ticket,
            payload: Payload::References(vec![Reference::new(5, "Ana"), Reference::new(12, "Ana")]),
            rejected: 0,
            attempts: 1,
        });
        store
    }

    #[test]
    fn test_dataset_names_parse() {
        assert_eq!("payment-methods".parse::<Dataset>().unwrap(), Dataset::PaymentMethods);
        assert_eq!("Vendors".parse::<Dataset>().unwrap(), Dataset::Vendors);
        assert!("ledger".parse::<Dataset>().is_err());
    }

    #[test]
    fn test_invoices_table_resolves_names() {
        let store = store();
        let table = Dataset::Invoices
            .build(store.state(), &AnalyticsSettings::default())
            .unwrap();
        assert_eq!(table.len(), 1);
        let row: Vec<String> = table.rows[0].iter().map(Cell::render).collect();
        assert_eq!(row, vec!["1", "2024-03", "2024-03-02", "120.50", "4", "Ana", ""]);
    }

    #[test]
    fn test_vendor_table_uses_consolidated_ids() {
        let store = store();
        let table = Dataset::Vendors
            .build(store.state(), &AnalyticsSettings::default())
            .unwrap();
        assert_eq!(table.rows[0][0], Cell::Integer(5));
        assert_eq!(table.rows[0][5], Cell::Number(100.0));
    }

    #[test]
    fn test_unloaded_or_failed_source_is_refused() {
        let mut store = store();
        let settings = AnalyticsSettings::default();

        let err = Dataset::Suppliers.build(store.state(), &settings).unwrap_err();
        assert!(matches!(err, ExportError::Data(ref e) if e.code() == ErrorCode::NotLoaded));

        let ticket = store.begin_fetch(Resource::PurchaseDeliveries);
        store.dispatch(Action::FetchFailed {
            ticket,
            message: "HTTP 500".to_string(),
            attempts: 3,
        });
        let err = Dataset::Purchases.build(store.state(), &settings).unwrap_err();
        assert!(matches!(err, ExportError::Data(ref e) if e.code() == ErrorCode::ResourceUnavailable));

        assert!(Dataset::Periods.build(store.state(), &settings).is_ok());
    }

    #[test]
    fn test_tyc_needs_a_matrix() {
        let store = store();
        assert!(Dataset::Tyc.build(store.state(), &AnalyticsSettings::default()).is_err());

        let articles = vec![Article { id: 1, name: "Ring".into(), family: None, active: true }];
        let sizes = vec![Size { id: 12, name: "12".into(), order: 1, active: true }];
        let stock = vec![StockRow { article: 1, color: 3, quantities: [(12, 2.0)].into_iter().collect() }];
        let matrix = build_matrix(
            &TycInputs { articles: &articles, colors: &[], sizes: &sizes, stock: &stock, sales: &[] },
            20,
        );

        let table = tyc_table(&matrix);
        assert_eq!(
            table.headers,
            vec!["Article", "Color", "12 stock", "12 sales", "Stock", "Sales", "Rotation", "Coverage"]
        );
        assert_eq!(table.rows[0][2], Cell::Number(2.0));
    }
}
