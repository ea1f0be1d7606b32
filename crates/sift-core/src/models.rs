//! Domain models for Sift

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single dated, categorized spending record
///
/// Records are read-only once loaded. Every derived structure (clusters,
/// profiles, anomalies) refers back to them by index into the input slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Category label (the "type" column of the source data)
    pub category: String,
    /// Free-text remark
    pub remark: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_country: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    pub is_blacklist: bool,
    pub is_imported: bool,
}

impl TransactionRecord {
    /// Create a record with derived fields defaulted from the category and amount
    pub fn new(
        category: impl Into<String>,
        remark: impl Into<String>,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        let category = category.into();
        Self {
            product_name: category.clone(),
            category,
            remark: remark.into(),
            amount,
            date,
            origin_country: None,
            quantity: 1,
            unit_price: amount,
            is_blacklist: false,
            is_imported: false,
        }
    }

    pub fn with_product(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = product_name.into();
        self
    }

    pub fn with_origin_country(mut self, country: impl Into<String>) -> Self {
        self.origin_country = Some(country.into());
        self
    }

    /// Set the quantity and recompute the unit price
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self.unit_price = if quantity > 0 {
            self.amount / quantity as f64
        } else {
            self.amount
        };
        self
    }

    pub fn with_blacklist(mut self, is_blacklist: bool) -> Self {
        self.is_blacklist = is_blacklist;
        self
    }

    pub fn with_imported(mut self, is_imported: bool) -> Self {
        self.is_imported = is_imported;
        self
    }

    /// Check the record invariants (finite amount and unit price)
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "Non-finite amount for record '{}'",
                self.remark
            )));
        }
        if !self.unit_price.is_finite() {
            return Err(Error::InvalidData(format!(
                "Non-finite unit price for record '{}'",
                self.remark
            )));
        }
        Ok(())
    }

    /// Calendar month key, e.g. "2024-03"
    pub fn month_key(&self) -> String {
        month_key(self.date.year(), self.date.month())
    }
}

/// Format a year/month pair as "YYYY-MM"
pub fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Sentiment classification of a remark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    /// Score attached to the label: +1, -1 or 0
    pub fn score(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
