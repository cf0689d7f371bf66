//! Top-N rankings by id

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::lookup::NameMap;
use crate::models::{Id, Invoice, PurchaseDelivery};
use crate::users::UserConsolidation;

/// One ranked id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub id: Id,
    pub name: String,
    pub total: Decimal,
    pub count: usize,
    /// Total over count, two decimals
    pub average: Decimal,
    /// Share of the grand total of all ranked ids
    pub share_pct: f64,
}

/// Accumulate `amount` per key and return the `top_n` largest totals.
///
/// Records without a key are ignored. Equal totals keep the order in which
/// their ids were first seen.
pub fn rank_by<'a, T: 'a>(
    records: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> Option<Id>,
    amount: impl Fn(&T) -> Decimal,
    names: &NameMap,
    top_n: usize,
) -> Vec<RankEntry> {
    let mut order: Vec<(Id, Decimal, usize)> = Vec::new();
    let mut index: HashMap<Id, usize> = HashMap::new();

    for record in records {
        let Some(id) = key(record) else { continue };
        let slot = *index.entry(id).or_insert_with(|| {
            order.push((id, Decimal::ZERO, 0));
            order.len() - 1
        });
        order[slot].1 += amount(record);
        order[slot].2 += 1;
    }

    let grand_total: Decimal = order.iter().map(|(_, total, _)| *total).sum();

    // slice::sort_by is stable
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.truncate(top_n);

    order
        .into_iter()
        .map(|(id, total, count)| RankEntry {
            id,
            name: names.name_or_id(id),
            total,
            count,
            average: (total / Decimal::from(count as u64)).round_dp(2),
            share_pct: share(total, grand_total),
        })
        .collect()
}

fn share(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    (part / whole * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0)
}

/// Vendors ranked by sales, duplicate users merged
pub fn top_vendors<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
    consolidation: &UserConsolidation,
    users: &NameMap,
    top_n: usize,
) -> Vec<RankEntry> {
    rank_by(invoices, |i| consolidation.vendor_of(i), |i| i.total, users, top_n)
}

/// Clients ranked by sales
pub fn top_clients<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
    contacts: &NameMap,
    top_n: usize,
) -> Vec<RankEntry> {
    rank_by(invoices, |i| i.client, |i| i.total, contacts, top_n)
}

/// Suppliers ranked by purchases
pub fn top_suppliers<'a>(
    purchases: impl IntoIterator<Item = &'a PurchaseDelivery>,
    contacts: &NameMap,
    top_n: usize,
) -> Vec<RankEntry> {
    rank_by(purchases, |p| p.supplier, |p| p.total, contacts, top_n)
}

/// Every payment method with its total, count and share
pub fn payment_method_breakdown<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
    payment_methods: &NameMap,
) -> Vec<RankEntry> {
    rank_by(invoices, |i| i.payment_method, |i| i.total, payment_methods, usize::MAX)
}
