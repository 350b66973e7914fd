use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::{MeasurementRecord, Metric, RowRef, Scores};

pub const COL_RESIDENT: &str = "Brukare-ID";
pub const COL_DATE: &str = "Datum";
pub const COL_OCCASION: &str = "Mättillfälle";
pub const COL_NOTES: &str = "Anteckningar";
pub const COL_RECORDED_BY: &str = "Registrerad av";
pub const COL_RECORDED_DATE: &str = "Registreringsdatum";
pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_ID: &str = "ID";

/// Sheet rows are 1-based and the first row holds the headers.
const FIRST_DATA_ROW: u32 = 2;

pub type RawRow = Map<String, Value>;

/// Converts the service's rows into records, replacing the whole collection.
pub fn ingest_rows(rows: &[RawRow]) -> Vec<MeasurementRecord> {
    let records: Vec<MeasurementRecord> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| record_from_row(row, RowRef(index as u32 + FIRST_DATA_ROW)))
        .collect();

    let mut seen = HashSet::new();
    for record in &records {
        if record.id.is_empty() {
            warn!(row = ?record.row, "measurement has no id");
        } else if !seen.insert(record.id.as_str()) {
            warn!(id = %record.id, "duplicate measurement id");
        }
    }

    records
}

pub fn record_from_row(row: &RawRow, row_ref: RowRef) -> MeasurementRecord {
    let mut scores = Scores::default();
    let mut missing_metrics = Vec::new();

    for metric in Metric::ALL {
        match row.get(metric.label()).and_then(coerce_number) {
            Some(value) => scores.set(metric, value),
            None => {
                warn!(row = row_ref.0, column = metric.label(), "metric missing or not numeric, using 0");
                missing_metrics.push(metric);
            }
        }
    }

    let date_raw = text(row, COL_DATE);
    let date = parse_date(&date_raw);
    if date.is_none() {
        warn!(row = row_ref.0, value = %date_raw, "unparseable occasion date");
    }

    MeasurementRecord {
        id: text(row, COL_ID),
        resident_id: text(row, COL_RESIDENT),
        date,
        date_raw,
        occasion_label: text(row, COL_OCCASION),
        scores,
        missing_metrics,
        notes: text(row, COL_NOTES),
        recorded_by: text(row, COL_RECORDED_BY),
        recorded_date: text(row, COL_RECORDED_DATE),
        timestamp: text(row, COL_TIMESTAMP),
        row: Some(row_ref),
    }
}

fn text(row: &RawRow, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    }
}

/// Reads a metric cell. Strings are read by their longest numeric prefix, so
/// `"7 (self-report)"` yields 7. `None` means the caller falls back to 0.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => parse_leading_float(text)?,
        _ => return None,
    };

    // A parsed zero is a real score; only NaN and infinities fall back.
    number.is_finite().then_some(number)
}

fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse().ok()
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, which is how the sheet
/// serialises date cells. A midnight in the sheet's zone arrives as the
/// previous evening in UTC, so timestamps are read as local calendar dates.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_date_in(text, &Local)
}

pub fn parse_date_in<Tz: TimeZone>(text: &str, zone: &Tz) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|timestamp| timestamp.with_timezone(zone).date_naive())
}
