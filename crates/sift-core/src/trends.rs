//! Spending trends and consumption patterns

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::TransactionRecord;
use crate::stats;
use crate::text;

/// Records priced above this multiple of the mean amount count as high unit price
const HIGH_UNIT_PRICE_MULTIPLIER: f64 = 3.0;

/// One month of spending with its change from the previous month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// "YYYY-MM"
    pub month: String,
    pub total: f64,
    pub count: usize,
    /// Percentage change from the previous month present in the data;
    /// absent for the first month or when the previous total is zero
    pub change_pct: Option<f64>,
    /// Category totals within the month
    #[serde(serialize_with = "text::serialize_clean_keys")]
    pub composition: BTreeMap<String, f64>,
}

/// Blacklist, imported and high-price spending
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsumptionPatterns {
    pub blacklist_count: usize,
    pub blacklist_total: f64,
    /// Distinct products bought from blacklisted sources
    #[serde(serialize_with = "text::serialize_clean_vec")]
    pub blacklist_products: Vec<String>,
    pub imported_count: usize,
    pub imported_total: f64,
    /// Imported spending as a percentage of all spending
    pub imported_share_pct: f64,
    pub high_unit_price_threshold: f64,
    pub high_unit_price_count: usize,
}

/// Spending on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Summed amount per category
pub fn category_totals(records: &[TransactionRecord]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for r in records {
        *totals.entry(r.category.clone()).or_insert(0.0) += r.amount;
    }
    totals
}

/// Month-by-month totals in calendar order
pub fn monthly_trend(records: &[TransactionRecord]) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<String, (f64, usize, BTreeMap<String, f64>)> = BTreeMap::new();
    for r in records {
        let (total, count, composition) = months.entry(r.month_key()).or_default();
        *total += r.amount;
        *count += 1;
        *composition.entry(r.category.clone()).or_insert(0.0) += r.amount;
    }

    let mut previous: Option<f64> = None;
    months
        .into_iter()
        .map(|(month, (total, count, composition))| {
            let change_pct = previous
                .filter(|prev| prev.abs() > f64::EPSILON)
                .map(|prev| (total - prev) / prev.abs() * 100.0);
            previous = Some(total);
            MonthlyTrend {
                month,
                total,
                count,
                change_pct,
                composition,
            }
        })
        .collect()
}

pub fn consumption_patterns(records: &[TransactionRecord]) -> ConsumptionPatterns {
    let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
    let grand_total: f64 = amounts.iter().sum();
    let threshold = stats::mean(&amounts) * HIGH_UNIT_PRICE_MULTIPLIER;

    let mut patterns = ConsumptionPatterns {
        high_unit_price_threshold: threshold,
        ..Default::default()
    };
    let mut blacklist_products = BTreeSet::new();

    for r in records {
        if r.is_blacklist {
            patterns.blacklist_count += 1;
            patterns.blacklist_total += r.amount;
            blacklist_products.insert(r.product_name.clone());
        }
        if r.is_imported {
            patterns.imported_count += 1;
            patterns.imported_total += r.amount;
        }
        if r.unit_price > threshold {
            patterns.high_unit_price_count += 1;
        }
    }

    patterns.blacklist_products = blacklist_products.into_iter().collect();
    if grand_total.abs() > f64::EPSILON {
        patterns.imported_share_pct = patterns.imported_total / grand_total * 100.0;
    }
    patterns
}

/// Total spending per day, oldest first
pub fn daily_series(records: &[TransactionRecord]) -> Vec<TimePoint> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        *days.entry(r.date).or_insert(0.0) += r.amount;
    }
    days.into_iter()
        .map(|(date, value)| TimePoint { date, value })
        .collect()
}
