//! Record normalization
//!
//! The ERP sends numbers as JSON numbers or strings depending on the
//! endpoint, and some records carry broken year/month fields. Each record
//! type implements [`FromRecord`]; records that cannot be normalized are
//! dropped with a warning and reported as [`Rejection`]s.

use chrono::{Datelike, NaiveDate};
use erpboard_client::Resource;
use erpboard_config::NormalizationConfig;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::{
    Article, Color, Id, Invoice, PurchaseDelivery, Reference, SaleLine, Size, StockRow,
};
use crate::time::{parse_date, YearMonth};

/// Plausible year range for transactional records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationRules {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for NormalizationRules {
    fn default() -> Self {
        Self::from_config(&NormalizationConfig::default())
    }
}

impl NormalizationRules {
    pub fn from_config(config: &NormalizationConfig) -> Self {
        Self {
            min_year: config.min_year,
            max_year: config.max_year,
        }
    }

    pub fn year_ok(&self, year: i64) -> bool {
        (self.min_year as i64..=self.max_year as i64).contains(&year)
    }
}

/// Why a record was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    NotAnObject,
    MissingField { field: &'static str },
    InvalidValue { field: &'static str, value: String },
    ImplausibleYear { year: i64 },
    InvalidMonth { month: i64 },
    MissingPeriod,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NotAnObject => write!(f, "record is not an object"),
            RejectReason::MissingField { field } => write!(f, "missing field '{}'", field),
            RejectReason::InvalidValue { field, value } => {
                write!(f, "invalid value {} for '{}'", value, field)
            }
            RejectReason::ImplausibleYear { year } => write!(f, "implausible year {}", year),
            RejectReason::InvalidMonth { month } => write!(f, "invalid month {}", month),
            RejectReason::MissingPeriod => write!(f, "no usable year/month or date"),
        }
    }
}

/// A dropped record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub resource: Resource,
    pub id: Option<Id>,
    pub reason: RejectReason,
}

/// Normalized records plus the ones that were dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub rejected: Vec<Rejection>,
}

/// Conversion from a raw ERP record
pub trait FromRecord: Sized {
    fn from_record(record: &Map<String, Value>, rules: &NormalizationRules)
        -> Result<Self, RejectReason>;
}

/// Normalize every raw record of `resource`, logging each rejection
pub fn normalize_records<T: FromRecord>(
    resource: Resource,
    raw: &[Value],
    rules: &NormalizationRules,
) -> Normalized<T> {
    let mut records = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for value in raw {
        let outcome = match value {
            Value::Object(map) => T::from_record(map, rules),
            _ => Err(RejectReason::NotAnObject),
        };
        match outcome {
            Ok(record) => records.push(record),
            Err(reason) => {
                let id = value.get("id").and_then(coerce_i64);
                log::warn!(
                    target: "erpboard::normalize",
                    "Dropping {} record {}: {}",
                    resource,
                    id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
                    reason
                );
                rejected.push(Rejection {
                    resource,
                    id,
                    reason,
                });
            }
        }
    }

    if !rejected.is_empty() {
        log::info!(
            target: "erpboard::normalize",
            "{}: kept {} record(s), dropped {}",
            resource,
            records.len(),
            rejected.len()
        );
    }

    Normalized { records, rejected }
}

// ==================== Coercion ====================

/// Integer from a JSON number or numeric string
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

/// Decimal amount from a JSON number or a string such as `"1234.5"`,
/// `"1234,5"` or `"1.234,50"`
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .ok()
                .or_else(|| Decimal::from_scientific(&text).ok())
        }
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s.to_string(),
    };
    Decimal::from_str(&cleaned).ok()
}

/// Float quantity from a JSON number or numeric string
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(_) => coerce_decimal(value).and_then(|d| d.to_f64()),
        _ => None,
    }
}

/// Boolean from `true`, `1`, `"S"`, `"true"` and the like
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "s" | "si" | "sí" | "y" | "yes" => Some(true),
            "false" | "0" | "n" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Non-empty trimmed text; numbers are rendered
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn present<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|v| !v.is_null())
}

fn optional_id(record: &Map<String, Value>, field: &'static str) -> Result<Option<Id>, RejectReason> {
    match present(record, field) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => coerce_i64(value).map(Some).ok_or_else(|| invalid(field, value)),
    }
}

fn required_id(record: &Map<String, Value>, field: &'static str) -> Result<Id, RejectReason> {
    optional_id(record, field)?.ok_or(RejectReason::MissingField { field })
}

fn amount(record: &Map<String, Value>, field: &'static str) -> Result<Decimal, RejectReason> {
    match present(record, field) {
        None => Ok(Decimal::ZERO),
        Some(value) => coerce_decimal(value).ok_or_else(|| invalid(field, value)),
    }
}

fn text(record: &Map<String, Value>, field: &str) -> Option<String> {
    present(record, field).and_then(coerce_string)
}

fn invalid(field: &'static str, value: &Value) -> RejectReason {
    RejectReason::InvalidValue {
        field,
        value: value.to_string(),
    }
}

/// Resolve the period of a transactional record.
///
/// Year and month fields win when both are plausible; otherwise the
/// date field is used when it parses to a plausible year.
pub fn resolve_period(
    record: &Map<String, Value>,
    year_field: &str,
    month_field: &str,
    date_field: &str,
    rules: &NormalizationRules,
) -> Result<(YearMonth, Option<NaiveDate>), RejectReason> {
    let date = text(record, date_field).and_then(|raw| parse_date(&raw));
    let year = present(record, year_field).and_then(coerce_i64);
    let month = present(record, month_field).and_then(coerce_i64);

    if let (Some(y), Some(m)) = (year, month) {
        if rules.year_ok(y) {
            if let Some(period) = YearMonth::new(y as i32, m.clamp(0, 13) as u32) {
                return Ok((period, date));
            }
        }
    }

    if let Some(d) = date {
        if rules.year_ok(d.year() as i64) {
            return Ok((YearMonth::from_date(d), Some(d)));
        }
    }

    Err(match (year, month) {
        (Some(y), _) if !rules.year_ok(y) => RejectReason::ImplausibleYear { year: y },
        (_, Some(m)) if !(1..=12).contains(&m) => RejectReason::InvalidMonth { month: m },
        (None, _) | (_, None) => match date {
            Some(d) => RejectReason::ImplausibleYear {
                year: d.year() as i64,
            },
            None => RejectReason::MissingPeriod,
        },
        _ => RejectReason::MissingPeriod,
    })
}

// ==================== Record Types ====================

impl FromRecord for Invoice {
    fn from_record(record: &Map<String, Value>, rules: &NormalizationRules) -> Result<Self, RejectReason> {
        let (period, date) = resolve_period(record, "eje", "mes", "fch", rules)?;
        Ok(Invoice {
            id: optional_id(record, "id")?,
            period,
            date,
            total: amount(record, "tot")?,
            client: optional_id(record, "clt")?,
            vendor: optional_id(record, "alt_usr")?,
            payment_method: optional_id(record, "fpg")?,
        })
    }
}

impl FromRecord for PurchaseDelivery {
    fn from_record(record: &Map<String, Value>, rules: &NormalizationRules) -> Result<Self, RejectReason> {
        let (period, date) = resolve_period(record, "eje", "mes", "fch", rules)?;
        Ok(PurchaseDelivery {
            id: optional_id(record, "id")?,
            period,
            date,
            total: amount(record, "tot")?,
            supplier: optional_id(record, "prv")?,
            series: text(record, "ser"),
        })
    }
}

impl FromRecord for Reference {
    fn from_record(record: &Map<String, Value>, _rules: &NormalizationRules) -> Result<Self, RejectReason> {
        let id = required_id(record, "id")?;
        let attributes = record
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "name")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Reference {
            id,
            name: text(record, "name").unwrap_or_default(),
            attributes,
        })
    }
}

impl FromRecord for Article {
    fn from_record(record: &Map<String, Value>, _rules: &NormalizationRules) -> Result<Self, RejectReason> {
        Ok(Article {
            id: required_id(record, "id")?,
            name: text(record, "name").unwrap_or_default(),
            family: text(record, "fam"),
            active: present(record, "act").and_then(coerce_bool).unwrap_or(true),
        })
    }
}

impl FromRecord for Color {
    fn from_record(record: &Map<String, Value>, _rules: &NormalizationRules) -> Result<Self, RejectReason> {
        let id = required_id(record, "id")?;
        Ok(Color {
            id,
            name: text(record, "name").unwrap_or_default(),
            order: present(record, "ord").and_then(coerce_i64).unwrap_or(id),
        })
    }
}

impl FromRecord for Size {
    fn from_record(record: &Map<String, Value>, _rules: &NormalizationRules) -> Result<Self, RejectReason> {
        let id = required_id(record, "id")?;
        Ok(Size {
            id,
            name: text(record, "name").unwrap_or_default(),
            order: present(record, "ord").and_then(coerce_i64).unwrap_or(id),
            active: present(record, "act").and_then(coerce_bool).unwrap_or(true),
        })
    }
}

impl FromRecord for StockRow {
    fn from_record(record: &Map<String, Value>, _rules: &NormalizationRules) -> Result<Self, RejectReason> {
        let quantities = match present(record, "tll") {
            None => BTreeMap::new(),
            Some(Value::Object(sizes)) => {
                let mut quantities = BTreeMap::new();
                for (size, qty) in sizes {
                    let size_id = size
                        .trim()
                        .parse::<Id>()
                        .map_err(|_| invalid("tll", &Value::String(size.clone())))?;
                    let qty = if qty.is_null() {
                        0.0
                    } else {
                        coerce_f64(qty).ok_or_else(|| invalid("tll", qty))?
                    };
                    quantities.insert(size_id, qty);
                }
                quantities
            }
            Some(other) => return Err(invalid("tll", other)),
        };
        Ok(StockRow {
            article: required_id(record, "art")?,
            color: required_id(record, "col")?,
            quantities,
        })
    }
}

impl FromRecord for SaleLine {
    fn from_record(record: &Map<String, Value>, _rules: &NormalizationRules) -> Result<Self, RejectReason> {
        let quantity = match present(record, "can") {
            Some(value) => coerce_f64(value).ok_or_else(|| invalid("can", value))?,
            None => return Err(RejectReason::MissingField { field: "can" }),
        };
        Ok(SaleLine {
            article: required_id(record, "art")?,
            color: required_id(record, "col")?,
            size: required_id(record, "tll")?,
            quantity,
        })
    }
}
