//! Monthly buckets and trend comparison

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Invoice, Periodic, PurchaseDelivery};
use crate::time::YearMonth;

/// Sum and count of one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub total: Decimal,
    pub count: usize,
}

impl PeriodTotals {
    fn add(&mut self, amount: Decimal) {
        self.total += amount;
        self.count += 1;
    }
}

/// Group records by year-month, chronologically
pub fn group_by_month<'a, T: Periodic + 'a>(
    records: impl IntoIterator<Item = &'a T>,
) -> BTreeMap<YearMonth, PeriodTotals> {
    let mut buckets: BTreeMap<YearMonth, PeriodTotals> = BTreeMap::new();
    for record in records {
        buckets.entry(record.period()).or_default().add(record.amount());
    }
    buckets
}

/// Sales versus purchases for one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub period: YearMonth,
    pub sales_total: Decimal,
    pub sales_count: usize,
    pub purchases_total: Decimal,
    pub purchases_count: usize,
    /// Sales minus purchases
    pub balance: Decimal,
    /// Balance over sales, `None` without sales
    pub margin_pct: Option<f64>,
}

/// Margin as a percentage of sales
pub fn margin_pct(sales: Decimal, purchases: Decimal) -> Option<f64> {
    if sales.is_zero() {
        return None;
    }
    ((sales - purchases) / sales * Decimal::ONE_HUNDRED).to_f64()
}

/// Build the combined monthly series over every month that has sales or
/// purchases
pub fn aggregate_periods<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
    purchases: impl IntoIterator<Item = &'a PurchaseDelivery>,
) -> Vec<PeriodBucket> {
    let sales = group_by_month(invoices);
    let purchases = group_by_month(purchases);

    let mut periods: Vec<YearMonth> = sales.keys().chain(purchases.keys()).copied().collect();
    periods.sort();
    periods.dedup();

    periods
        .into_iter()
        .map(|period| {
            let s = sales.get(&period).copied().unwrap_or_default();
            let p = purchases.get(&period).copied().unwrap_or_default();
            PeriodBucket {
                period,
                sales_total: s.total,
                sales_count: s.count,
                purchases_total: p.total,
                purchases_count: p.count,
                balance: s.total - p.total,
                margin_pct: margin_pct(s.total, p.total),
            }
        })
        .collect()
}

// ==================== Trend ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Comparison of the two most recent complete months
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub latest: YearMonth,
    pub previous: YearMonth,
    pub latest_total: Decimal,
    pub previous_total: Decimal,
    /// `None` when the previous month is zero
    pub variation_pct: Option<f64>,
    pub direction: TrendDirection,
    /// The current month was left out as incomplete
    pub skipped_partial: bool,
}

impl Trend {
    /// Variation formatted as `+33.3%`, or `n/a`
    pub fn variation_label(&self) -> String {
        match self.variation_pct {
            Some(pct) => format!("{:+.1}%", pct),
            None => "n/a".to_string(),
        }
    }
}

/// Compare the last two complete buckets of `series`.
///
/// When the last bucket is the month of `today` and `today` is before
/// `cutoff_day`, that month is partial and the two buckets before it are
/// compared instead. Returns `None` with fewer than two usable buckets.
pub fn compute_trend(
    series: &BTreeMap<YearMonth, PeriodTotals>,
    today: NaiveDate,
    cutoff_day: Option<u32>,
) -> Option<Trend> {
    let mut buckets: Vec<(YearMonth, Decimal)> =
        series.iter().map(|(period, t)| (*period, t.total)).collect();

    let skipped_partial = match buckets.last() {
        Some((period, _)) if period.is_partial(today, cutoff_day) => {
            buckets.pop();
            true
        }
        _ => false,
    };

    let (latest, latest_total) = buckets.pop()?;
    let (previous, previous_total) = buckets.pop()?;

    let variation_pct = if previous_total.is_zero() {
        None
    } else {
        ((latest_total - previous_total) / previous_total * Decimal::ONE_HUNDRED).to_f64()
    };
    let direction = match latest_total.cmp(&previous_total) {
        std::cmp::Ordering::Greater => TrendDirection::Up,
        std::cmp::Ordering::Less => TrendDirection::Down,
        std::cmp::Ordering::Equal => TrendDirection::Flat,
    };

    Some(Trend {
        latest,
        previous,
        latest_total,
        previous_total,
        variation_pct,
        direction,
        skipped_partial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_records, NormalizationRules};
    use erpboard_client::Resource;
    use proptest::prelude::*;
    use serde_json::json;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(period: YearMonth, total: Decimal) -> Invoice {
        Invoice {
            id: None,
            period,
            date: None,
            total,
            client: None,
            vendor: None,
            payment_method: None,
        }
    }

    #[test]
    fn test_march_april_example() {
        let raw = vec![
            json!({ "eje": 2024, "mes": 3, "tot": 100 }),
            json!({ "eje": 2024, "mes": 3, "tot": 50 }),
            json!({ "eje": 2024, "mes": 4, "tot": 200 }),
        ];
        let invoices = normalize_records::<Invoice>(Resource::Invoices, &raw, &NormalizationRules::default()).records;

        let series = group_by_month(&invoices);
        assert_eq!(series[&ym(2024, 3)].total, Decimal::from(150));
        assert_eq!(series[&ym(2024, 3)].count, 2);
        assert_eq!(series[&ym(2024, 4)].total, Decimal::from(200));

        let trend = compute_trend(&series, date(2024, 6, 1), Some(25)).unwrap();
        assert_eq!(trend.latest, ym(2024, 4));
        assert_eq!(trend.previous, ym(2024, 3));
        assert!((trend.variation_pct.unwrap() - 33.333).abs() < 0.01);
        assert_eq!(trend.variation_label(), "+33.3%");
        assert_eq!(trend.direction, TrendDirection::Up);
        assert!(!trend.skipped_partial);
    }

    #[test]
    fn test_partial_current_month_is_skipped() {
        let mut series = BTreeMap::new();
        for (m, total) in [(2, 100), (3, 80), (4, 5)] {
            series.insert(ym(2024, m), PeriodTotals { total: Decimal::from(total), count: 1 });
        }

        let trend = compute_trend(&series, date(2024, 4, 10), Some(25)).unwrap();
        assert!(trend.skipped_partial);
        assert_eq!(trend.latest, ym(2024, 3));
        assert_eq!(trend.variation_pct, Some(-20.0));

        let trend = compute_trend(&series, date(2024, 4, 26), Some(25)).unwrap();
        assert_eq!(trend.latest, ym(2024, 4));

        let trend = compute_trend(&series, date(2024, 4, 10), None).unwrap();
        assert_eq!(trend.latest, ym(2024, 4));
    }

    #[test]
    fn test_trend_needs_two_buckets_and_nonzero_base() {
        let mut series = BTreeMap::new();
        series.insert(ym(2024, 1), PeriodTotals::default());
        assert_eq!(compute_trend(&series, date(2025, 1, 1), Some(25)), None);

        series.insert(ym(2024, 2), PeriodTotals { total: Decimal::from(10), count: 1 });
        let trend = compute_trend(&series, date(2025, 1, 1), Some(25)).unwrap();
        assert_eq!(trend.variation_pct, None);
        assert_eq!(trend.variation_label(), "n/a");
    }

    #[test]
    fn test_aggregate_periods_merges_sales_and_purchases() {
        let invoices = vec![invoice(ym(2024, 1), Decimal::from(200))];
        let purchases = vec![
            PurchaseDelivery {
                id: None,
                period: ym(2024, 1),
                date: None,
                total: Decimal::from(50),
                supplier: None,
                series: None,
            },
            PurchaseDelivery {
                id: None,
                period: ym(2023, 12),
                date: None,
                total: Decimal::from(30),
                supplier: None,
                series: None,
            },
        ];

        let buckets = aggregate_periods(&invoices, &purchases);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period, ym(2023, 12));
        assert_eq!(buckets[0].margin_pct, None);
        assert_eq!(buckets[0].balance, Decimal::from(-30));
        assert_eq!(buckets[1].balance, Decimal::from(150));
        assert_eq!(buckets[1].margin_pct, Some(75.0));
    }

    proptest! {
        #[test]
        fn prop_bucket_totals_match_raw_sums(
            rows in prop::collection::vec((2020i32..2026, 1u32..=12, -10_000i64..100_000), 0..80)
        ) {
            let invoices: Vec<Invoice> = rows
                .iter()
                .map(|(y, m, cents)| invoice(ym(*y, *m), Decimal::new(*cents, 2)))
                .collect();

            let series = group_by_month(&invoices);
            for (period, totals) in &series {
                let expected: Decimal = invoices
                    .iter()
                    .filter(|i| i.period == *period)
                    .map(|i| i.total)
                    .sum();
                prop_assert_eq!(totals.total, expected);
            }
            let counted: usize = series.values().map(|t| t.count).sum();
            prop_assert_eq!(counted, invoices.len());
            prop_assert!(series.keys().zip(series.keys().skip(1)).all(|(a, b)| a < b));
        }
    }
}
