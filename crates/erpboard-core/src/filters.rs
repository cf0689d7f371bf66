//! Dashboard filter selection

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::{Id, Invoice, PurchaseDelivery};
use crate::time::YearMonth;
use crate::users::UserConsolidation;

/// Active filter selection.
///
/// Period filters apply to sales and purchases. Vendor, client and
/// payment-method filters apply to sales only; the supplier filter applies
/// to purchases only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub year: Option<i32>,
    /// First month included (1-12)
    pub month_from: Option<u32>,
    /// Last month included (1-12)
    pub month_to: Option<u32>,
    /// Canonical vendor id
    pub vendor: Option<Id>,
    pub client: Option<Id>,
    pub payment_method: Option<Id>,
    pub supplier: Option<Id>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        *self == Filters::default()
    }

    /// Reject month values outside 1-12 and reversed ranges
    pub fn validate(&self) -> CoreResult<()> {
        for (field, month) in [("month_from", self.month_from), ("month_to", self.month_to)] {
            if let Some(m) = month {
                if !(1..=12).contains(&m) {
                    return Err(CoreError::InvalidRequest {
                        message: format!("{} must be between 1 and 12, got {}", field, m),
                    });
                }
            }
        }
        if let (Some(from), Some(to)) = (self.month_from, self.month_to) {
            if from > to {
                return Err(CoreError::InvalidRequest {
                    message: format!("month_from ({}) is after month_to ({})", from, to),
                });
            }
        }
        Ok(())
    }

    pub fn matches_period(&self, period: YearMonth) -> bool {
        self.year.map_or(true, |y| period.year == y)
            && self.month_from.map_or(true, |m| period.month >= m)
            && self.month_to.map_or(true, |m| period.month <= m)
    }

    pub fn matches_invoice(&self, invoice: &Invoice, users: &UserConsolidation) -> bool {
        self.matches_period(invoice.period)
            && self.vendor.map_or(true, |v| {
                users.vendor_of(invoice) == Some(users.canonical_id(v))
            })
            && self.client.map_or(true, |c| invoice.client == Some(c))
            && self
                .payment_method
                .map_or(true, |p| invoice.payment_method == Some(p))
    }

    pub fn matches_purchase(&self, purchase: &PurchaseDelivery) -> bool {
        self.matches_period(purchase.period)
            && self.supplier.map_or(true, |s| purchase.supplier == Some(s))
    }
}
