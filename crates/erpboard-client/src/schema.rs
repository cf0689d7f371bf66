//! Explicit endpoint schema: which path serves a resource and which
//! response field carries its records.

use serde::{Deserialize, Serialize};

/// ERP resources read by erpboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Sales invoices (`fac_t`)
    Invoices,
    /// Sales invoice lines with article/color/size (`fac_lin_t`)
    InvoiceLines,
    /// Purchase delivery notes (`com_alb_g`)
    PurchaseDeliveries,
    /// Contacts: clients and suppliers (`ent_m`)
    Contacts,
    /// Users, acting as sales vendors (`usr_m`)
    Users,
    /// Companies (`emp_m`)
    Companies,
    /// Payment methods (`fpg_m`)
    PaymentMethods,
    /// Articles (`art_m`)
    Articles,
    /// Colors (`col_m`)
    Colors,
    /// Sizes (`tll_m`)
    Sizes,
    /// Stock per article and color (`exs_g`)
    Stock,
}

impl Resource {
    /// Resources loaded on every dashboard reload
    pub const DASHBOARD: [Resource; 6] = [
        Resource::Invoices,
        Resource::PurchaseDeliveries,
        Resource::Contacts,
        Resource::Users,
        Resource::Companies,
        Resource::PaymentMethods,
    ];

    /// ERP table name
    pub fn table(&self) -> &'static str {
        match self {
            Resource::Invoices => "fac_t",
            Resource::InvoiceLines => "fac_lin_t",
            Resource::PurchaseDeliveries => "com_alb_g",
            Resource::Contacts => "ent_m",
            Resource::Users => "usr_m",
            Resource::Companies => "emp_m",
            Resource::PaymentMethods => "fpg_m",
            Resource::Articles => "art_m",
            Resource::Colors => "col_m",
            Resource::Sizes => "tll_m",
            Resource::Stock => "exs_g",
        }
    }

    /// Request path relative to the API base URL
    pub fn path(&self) -> String {
        format!("/{}", self.table())
    }

    /// Response field holding the record array
    pub fn field(&self) -> &'static str {
        self.table()
    }

    /// Losing a critical resource puts the dashboard in an error state;
    /// the others degrade to raw ids.
    pub fn is_critical(&self) -> bool {
        matches!(self, Resource::Invoices | Resource::PurchaseDeliveries)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Invoices => "invoices",
            Resource::InvoiceLines => "invoice_lines",
            Resource::PurchaseDeliveries => "purchase_deliveries",
            Resource::Contacts => "contacts",
            Resource::Users => "users",
            Resource::Companies => "companies",
            Resource::PaymentMethods => "payment_methods",
            Resource::Articles => "articles",
            Resource::Colors => "colors",
            Resource::Sizes => "sizes",
            Resource::Stock => "stock",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
