//! Anomaly detection
//!
//! Two one-sided strategies, both deterministic:
//! - [`TopFraction`] ranks records by amount and flags the top share
//!   (the default)
//! - [`AmountThreshold`] flags records above a multiple of the mean amount

use tracing::debug;

use crate::models::TransactionRecord;
use crate::stats;

/// A strategy that picks anomalous records by index
pub trait AnomalyStrategy {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Indices of anomalous records, in detection order
    fn detect(&self, records: &[TransactionRecord]) -> Vec<usize>;
}

/// Flags the `contamination` share of records with the largest amounts
#[derive(Debug, Clone, Copy)]
pub struct TopFraction {
    contamination: f64,
}

impl TopFraction {
    pub fn new(contamination: f64) -> Self {
        Self { contamination }
    }

    /// Number of records to flag out of `n`, or 0 for a degenerate fraction
    pub fn flag_count(&self, n: usize) -> usize {
        if n == 0 || !(self.contamination > 0.0 && self.contamination < 1.0) {
            return 0;
        }
        let k = (n as f64 * self.contamination).round() as usize;
        k.max(1).min(n - 1)
    }
}

impl Default for TopFraction {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl AnomalyStrategy for TopFraction {
    fn name(&self) -> &'static str {
        "top_fraction"
    }

    fn detect(&self, records: &[TransactionRecord]) -> Vec<usize> {
        let k = self.flag_count(records.len());
        if k == 0 {
            return vec![];
        }

        let mut ranked: Vec<usize> = (0..records.len()).collect();
        // Stable sort keeps input order among equal amounts
        ranked.sort_by(|&a, &b| records[b].amount.total_cmp(&records[a].amount));
        ranked.truncate(k);

        debug!(flagged = k, total = records.len(), "Top-fraction anomalies");
        ranked
    }
}

/// Flags every record whose amount exceeds `multiplier` x the mean amount
#[derive(Debug, Clone, Copy)]
pub struct AmountThreshold {
    multiplier: f64,
}

impl AmountThreshold {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }
}

impl Default for AmountThreshold {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl AnomalyStrategy for AmountThreshold {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn detect(&self, records: &[TransactionRecord]) -> Vec<usize> {
        if records.is_empty() {
            return vec![];
        }
        let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
        let limit = stats::mean(&amounts) * self.multiplier;

        records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.amount > limit)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Human-readable "remark (amount)" descriptions for flagged records
pub fn describe(records: &[TransactionRecord], indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .filter_map(|&i| records.get(i))
        .map(|r| format!("{} ({:.2})", r.remark.trim(), r.amount))
        .collect()
}
