//! Test utilities for sift-core
//!
//! Fixture builders shared by unit tests and, with the `test-utils` feature,
//! by downstream crates.

use chrono::NaiveDate;

use crate::models::TransactionRecord;

/// Parse a "YYYY-MM-DD" date, panicking on malformed fixtures
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Build a record from category, remark, amount and "YYYY-MM-DD" date
pub fn record(category: &str, remark: &str, amount: f64, day: &str) -> TransactionRecord {
    TransactionRecord::new(category, remark, amount, date(day))
}

/// Records with the given amounts, all in one category on consecutive days
pub fn records_with_amounts(amounts: &[f64]) -> Vec<TransactionRecord> {
    let start = date("2024-01-01");
    amounts
        .iter()
        .enumerate()
        .map(|(i, &amount)| {
            TransactionRecord::new(
                "misc",
                format!("item {}", i),
                amount,
                start + chrono::Duration::days(i as i64),
            )
        })
        .collect()
}

/// Float comparison with a fixed tolerance
pub fn approx_eq(a: f64, b: f64) -> bool {
    approx_eq_within(a, b, 1e-9)
}

/// Float comparison with an explicit tolerance, for values that went
/// through several accumulation steps
pub fn approx_eq_within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}
