//! Descriptive statistics
//!
//! [`Stats`] summarizes a numeric series. [`Breakdowns`] applies it to the
//! usual partitions of the record set (category, product, month, ...).

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::models::TransactionRecord;
use crate::text;

/// Summary of a numeric series
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 divisor), 0 for fewer than two values
    pub std_dev: f64,
}

impl Stats {
    /// Summarize a series. An empty series yields all zeros.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let count = values.len();
        let total: f64 = values.iter().sum();
        let mean = total / count as f64;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            count,
            total,
            mean,
            min: sorted[0],
            max: sorted[count - 1],
            median: median_of_sorted(&sorted),
            std_dev: sample_std_dev(values, mean),
        }
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation around a known mean
pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance: f64 =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Arithmetic mean, 0 for an empty series
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Collects values per key before summarizing
#[derive(Debug, Default)]
struct Grouped {
    groups: BTreeMap<String, Vec<f64>>,
}

impl Grouped {
    fn add(&mut self, key: &str, value: f64) {
        self.groups.entry(key.to_string()).or_default().push(value);
    }

    fn finish(self) -> BTreeMap<String, Stats> {
        self.groups
            .into_iter()
            .map(|(key, values)| (key, Stats::from_values(&values)))
            .collect()
    }
}

/// Per-partition statistics over amounts (unit prices for `unit_price_by_product`)
#[derive(Debug, Clone, Default, Serialize)]
pub struct Breakdowns {
    #[serde(serialize_with = "text::serialize_clean_keys")]
    pub by_category: BTreeMap<String, Stats>,
    #[serde(serialize_with = "text::serialize_clean_keys")]
    pub by_product: BTreeMap<String, Stats>,
    /// Only records with a known origin country
    #[serde(serialize_with = "text::serialize_clean_keys")]
    pub by_country: BTreeMap<String, Stats>,
    /// Keyed "YYYY-MM"
    pub by_month: BTreeMap<String, Stats>,
    /// Keyed by ISO weekday abbreviation ("Mon", "Tue", ...)
    pub by_weekday: BTreeMap<String, Stats>,
    #[serde(serialize_with = "text::serialize_clean_keys")]
    pub unit_price_by_product: BTreeMap<String, Stats>,
}

impl Breakdowns {
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let mut category = Grouped::default();
        let mut product = Grouped::default();
        let mut country = Grouped::default();
        let mut month = Grouped::default();
        let mut weekday = Grouped::default();
        let mut unit_price = Grouped::default();

        for r in records {
            category.add(&r.category, r.amount);
            product.add(&r.product_name, r.amount);
            if let Some(c) = r.origin_country.as_deref().filter(|c| !c.is_empty()) {
                country.add(c, r.amount);
            }
            month.add(&r.month_key(), r.amount);
            weekday.add(&r.date.weekday().to_string(), r.amount);
            unit_price.add(&r.product_name, r.unit_price);
        }

        Self {
            by_category: category.finish(),
            by_product: product.finish(),
            by_country: country.finish(),
            by_month: month.finish(),
            by_weekday: weekday.finish(),
            unit_price_by_product: unit_price.finish(),
        }
    }
}
