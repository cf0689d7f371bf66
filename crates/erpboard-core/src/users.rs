//! Duplicate-user consolidation
//!
//! The ERP keeps several user records for the same person. Users sharing
//! a trimmed name are merged into the one with the smallest id, and vendor
//! aggregation always goes through that canonical id.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Id, Invoice, Reference};

/// Users that share a name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub name: String,
    pub canonical: Id,
    /// Every id in the group, ascending, canonical first
    pub ids: Vec<Id>,
}

/// Mapping from any user id to its canonical id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserConsolidation {
    #[serde(skip)]
    canonical: HashMap<Id, Id>,
    groups: Vec<DuplicateGroup>,
}

impl UserConsolidation {
    /// Group users by trimmed name. Users without a name are never merged.
    pub fn build(users: &[Reference]) -> Self {
        let mut by_name: BTreeMap<&str, Vec<Id>> = BTreeMap::new();
        let mut canonical = HashMap::new();

        for user in users {
            let name = user.name.trim();
            if name.is_empty() {
                canonical.insert(user.id, user.id);
            } else {
                by_name.entry(name).or_default().push(user.id);
            }
        }

        let mut groups = Vec::new();
        for (name, mut ids) in by_name {
            ids.sort_unstable();
            ids.dedup();
            let first = ids[0];
            for id in &ids {
                canonical.insert(*id, first);
            }
            if ids.len() > 1 {
                log::debug!(
                    target: "erpboard::users",
                    "Merging users {:?} named '{}' into {}",
                    ids,
                    name,
                    first
                );
                groups.push(DuplicateGroup {
                    name: name.to_string(),
                    canonical: first,
                    ids,
                });
            }
        }

        Self { canonical, groups }
    }

    /// Canonical id for `id`; unknown ids map to themselves
    pub fn canonical_id(&self, id: Id) -> Id {
        self.canonical.get(&id).copied().unwrap_or(id)
    }

    /// Canonical vendor of an invoice
    pub fn vendor_of(&self, invoice: &Invoice) -> Option<Id> {
        invoice.vendor.map(|id| self.canonical_id(id))
    }

    pub fn duplicate_groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Number of ids that map to a different canonical id
    pub fn merged_count(&self) -> usize {
        self.groups.iter().map(|g| g.ids.len() - 1).sum()
    }
}

/// Raw versus consolidated vendor totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub raw_total: Decimal,
    pub consolidated_total: Decimal,
    pub raw_count: usize,
    pub consolidated_count: usize,
    pub raw_vendors: usize,
    pub consolidated_vendors: usize,
    pub balanced: bool,
}

/// Sum invoices per raw vendor id and per canonical vendor id and
/// check that both views agree
pub fn reconcile<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
    consolidation: &UserConsolidation,
) -> Reconciliation {
    let mut raw: HashMap<Option<Id>, (Decimal, usize)> = HashMap::new();
    let mut consolidated: HashMap<Option<Id>, (Decimal, usize)> = HashMap::new();

    for invoice in invoices {
        let entry = raw.entry(invoice.vendor).or_default();
        entry.0 += invoice.total;
        entry.1 += 1;

        let entry = consolidated.entry(consolidation.vendor_of(invoice)).or_default();
        entry.0 += invoice.total;
        entry.1 += 1;
    }

    let sum = |map: &HashMap<Option<Id>, (Decimal, usize)>| {
        map.values()
            .fold((Decimal::ZERO, 0usize), |acc, (t, c)| (acc.0 + t, acc.1 + c))
    };
    let distinct = |map: &HashMap<Option<Id>, (Decimal, usize)>| {
        map.keys().flatten().collect::<HashSet<_>>().len()
    };

    let (raw_total, raw_count) = sum(&raw);
    let (consolidated_total, consolidated_count) = sum(&consolidated);
    let balanced = raw_total == consolidated_total && raw_count == consolidated_count;
    if !balanced {
        log::error!(
            target: "erpboard::users",
            "Vendor reconciliation mismatch: raw {} ({}) vs consolidated {} ({})",
            raw_total,
            raw_count,
            consolidated_total,
            consolidated_count
        );
    }

    Reconciliation {
        raw_total,
        consolidated_total,
        raw_count,
        consolidated_count,
        raw_vendors: distinct(&raw),
        consolidated_vendors: distinct(&consolidated),
        balanced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::YearMonth;
    use proptest::prelude::*;

    fn sale(vendor: Option<Id>, total: i64) -> Invoice {
        Invoice {
            id: None,
            period: YearMonth::new(2024, 1).unwrap(),
            date: None,
            total: Decimal::from(total),
            client: None,
            vendor,
            payment_method: None,
        }
    }

    #[test]
    fn test_smallest_id_is_canonical() {
        let users = vec![
            Reference::new(12, "Ana"),
            Reference::new(5, " Ana "),
            Reference::new(7, "Luis"),
        ];
        let consolidation = UserConsolidation::build(&users);

        assert_eq!(consolidation.canonical_id(12), 5);
        assert_eq!(consolidation.canonical_id(5), 5);
        assert_eq!(consolidation.canonical_id(7), 7);
        assert_eq!(consolidation.canonical_id(99), 99);
        assert_eq!(consolidation.duplicate_groups().len(), 1);
        assert_eq!(consolidation.duplicate_groups()[0].ids, vec![5, 12]);
        assert_eq!(consolidation.merged_count(), 1);
    }

    #[test]
    fn test_nameless_users_are_not_merged() {
        let users = vec![Reference::new(1, ""), Reference::new(2, "  ")];
        let consolidation = UserConsolidation::build(&users);
        assert_eq!(consolidation.canonical_id(2), 2);
        assert!(consolidation.duplicate_groups().is_empty());
    }

    #[test]
    fn test_reconciliation_balances() {
        let users = vec![Reference::new(5, "Ana"), Reference::new(12, "Ana")];
        let consolidation = UserConsolidation::build(&users);
        let sales = vec![sale(Some(12), 100), sale(Some(5), 50), sale(None, 20)];

        let report = reconcile(&sales, &consolidation);
        assert!(report.balanced);
        assert_eq!(report.raw_total, Decimal::from(170));
        assert_eq!(report.raw_count, 3);
        assert_eq!(report.raw_vendors, 2);
        assert_eq!(report.consolidated_vendors, 1);
    }

    proptest! {
        #[test]
        fn prop_consolidation_preserves_totals(
            names in prop::collection::vec(0u8..4, 1..12),
            sales in prop::collection::vec((0usize..12, 0i64..10_000), 0..40),
        ) {
            let users: Vec<Reference> = names
                .iter()
                .enumerate()
                .map(|(i, n)| Reference::new(i as Id + 1, format!("user {}", n)))
                .collect();
            let consolidation = UserConsolidation::build(&users);
            let invoices: Vec<Invoice> = sales
                .iter()
                .map(|(user, total)| sale(Some((*user % users.len()) as Id + 1), *total))
                .collect();

            let report = reconcile(&invoices, &consolidation);
            prop_assert!(report.balanced);
            prop_assert_eq!(report.raw_count, invoices.len());
            prop_assert!(report.consolidated_vendors <= report.raw_vendors);
        }
    }
}
