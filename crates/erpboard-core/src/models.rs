//! Normalized ERP records

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::time::YearMonth;

/// ERP record identifier
pub type Id = i64;

// ==================== Transactions ====================

/// Sales invoice (`fac_t`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Option<Id>,
    pub period: YearMonth,
    pub date: Option<NaiveDate>,
    pub total: Decimal,
    pub client: Option<Id>,
    /// User who issued the invoice (`alt_usr`)
    pub vendor: Option<Id>,
    pub payment_method: Option<Id>,
}

/// Purchase delivery note (`com_alb_g`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseDelivery {
    pub id: Option<Id>,
    pub period: YearMonth,
    pub date: Option<NaiveDate>,
    pub total: Decimal,
    pub supplier: Option<Id>,
    pub series: Option<String>,
}

/// Records that fall into a period bucket with an amount
pub trait Periodic {
    fn period(&self) -> YearMonth;
    fn amount(&self) -> Decimal;
}

impl Periodic for Invoice {
    fn period(&self) -> YearMonth {
        self.period
    }

    fn amount(&self) -> Decimal {
        self.total
    }
}

impl Periodic for PurchaseDelivery {
    fn period(&self) -> YearMonth {
        self.period
    }

    fn amount(&self) -> Decimal {
        self.total
    }
}

// ==================== Reference Data ====================

/// Flat reference entity: contact, user, company or payment method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Id,
    pub name: String,
    /// Remaining fields of the raw record
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Reference {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Catalogue article (`art_m`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Id,
    pub name: String,
    pub family: Option<String>,
    pub active: bool,
}

/// Color (`col_m`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub id: Id,
    pub name: String,
    /// Display order
    pub order: i64,
}

/// Size (`tll_m`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub id: Id,
    pub name: String,
    /// Display order
    pub order: i64,
    pub active: bool,
}

// ==================== TyC Source Rows ====================

/// Stock of one article/color pair, per size (`exs_g`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub article: Id,
    pub color: Id,
    pub quantities: BTreeMap<Id, f64>,
}

/// Quantity sold on one invoice line (`fac_lin_t`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub article: Id,
    pub color: Id,
    pub size: Id,
    pub quantity: f64,
}
