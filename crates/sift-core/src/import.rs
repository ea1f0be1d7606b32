//! CSV record loading
//!
//! Format: type,remark,amount,date[,product,country,quantity]
//!
//! Text fields are validated as UTF-8 here, once. Rows with an unparseable
//! amount or date are skipped with a warning; the rest of the file still
//! loads.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::labels::{self, LabelLookup};
use crate::models::TransactionRecord;
use crate::text;

const COL_TYPE: usize = 0;
const COL_REMARK: usize = 1;
const COL_AMOUNT: usize = 2;
const COL_DATE: usize = 3;
const COL_PRODUCT: usize = 4;
const COL_COUNTRY: usize = 5;
const COL_QUANTITY: usize = 6;

/// Parse records from CSV with a header row
///
/// Blacklist and imported flags are set when the remark contains the
/// corresponding marker from `labels`.
pub fn parse_csv<R: Read>(reader: R, labels: &dyn LabelLookup) -> Result<Vec<TransactionRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let blacklist_marker = labels.label(labels::BLACKLIST);
    let imported_marker = labels.label(labels::IMPORTED);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.byte_records().enumerate() {
        let row = result?;
        match parse_row(&row) {
            Ok(mut record) => {
                record.is_blacklist =
                    !blacklist_marker.is_empty() && record.remark.contains(&blacklist_marker);
                record.is_imported =
                    !imported_marker.is_empty() && record.remark.contains(&imported_marker);
                records.push(record);
            }
            Err(e) => {
                skipped += 1;
                // +2: one for the header, one for 1-based numbering
                warn!(line = line + 2, error = %e, "Skipping malformed row");
            }
        }
    }

    debug!(parsed = records.len(), skipped, "Parsed CSV records");
    Ok(records)
}

fn field(row: &ByteRecord, index: usize, name: &str) -> Option<String> {
    row.get(index)
        .map(|bytes| text::clean_bytes(bytes, name))
        .filter(|s| !s.is_empty())
}

fn required(row: &ByteRecord, index: usize, name: &str) -> Result<String> {
    field(row, index, name).ok_or_else(|| Error::InvalidData(format!("Missing {}", name)))
}

fn parse_row(row: &ByteRecord) -> Result<TransactionRecord> {
    let category = required(row, COL_TYPE, "type")?;
    let remark = field(row, COL_REMARK, "remark").unwrap_or_default();
    let amount = parse_amount(&required(row, COL_AMOUNT, "amount")?)?;
    let date = parse_date(&required(row, COL_DATE, "date")?)?;

    let mut record = TransactionRecord::new(category, remark, amount, date);
    if let Some(product) = field(row, COL_PRODUCT, "product") {
        record = record.with_product(product);
    }
    if let Some(country) = field(row, COL_COUNTRY, "country") {
        record = record.with_origin_country(country);
    }
    if let Some(quantity) = field(row, COL_QUANTITY, "quantity") {
        let quantity = quantity
            .parse::<u32>()
            .map_err(|_| Error::InvalidData(format!("Unable to parse quantity: {}", quantity)))?;
        record = record.with_quantity(quantity);
    }

    record.validate()?;
    Ok(record)
}

/// Parse a date in one of the accepted formats
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%Y/%m/%d", // 2024/01/15
        "%Y.%m.%d", // 2024.01.15
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    // Timestamps keep only the day
    if let Some((day, _time)) = s.split_once(' ') {
        if let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            return Ok(date);
        }
    }

    Err(Error::InvalidData(format!("Unable to parse date: {}", s)))
}

/// Parse an amount, ignoring currency symbols and thousands separators
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['¥', '￥', '$', ',', ' '], "");

    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| Error::InvalidData(format!("Unable to parse amount: {}", s)))?;
    if !amount.is_finite() {
        return Err(Error::InvalidData(format!("Non-finite amount: {}", s)));
    }
    Ok(amount)
}
