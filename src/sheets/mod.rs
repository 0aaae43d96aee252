// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spreadsheet-backed persistence.
//!
//! Tables are sheets whose first row is a header. Rows come back as
//! untyped strings; each table type decodes them through [`SheetRecord`]
//! and writes them back positionally in the order of its `COLUMNS`.

pub mod gateway;

pub use gateway::{SheetAck, SheetsGateway};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Sheet (tab) names as constants.
pub mod tables {
    pub const USERS: &str = "Users";
    pub const STAYS: &str = "Stays";
    pub const BOOKINGS: &str = "Bookings";
}

/// Range read when callers do not ask for a narrower one.
pub const DEFAULT_RANGE: &str = "A1:Z1000";

/// One data row keyed by normalized header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    /// Field value, or the empty string when the column is absent.
    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Record {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Record(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// A table row type with a fixed, contractual column layout.
pub trait SheetRecord: Sized {
    /// Sheet (tab) holding this table.
    const SHEET: &'static str;
    /// Header labels, in wire order.
    const COLUMNS: &'static [&'static str];
    /// Bumped whenever `COLUMNS` changes shape.
    const SCHEMA_VERSION: u32;

    /// Encode as one positional row matching `COLUMNS`.
    fn to_row(&self) -> Vec<Value>;

    /// Decode from a parsed record. Never fails; malformed fields degrade.
    fn from_record(record: &Record) -> Self;
}

/// Normalize a header label into a field key: lowercase, whitespace runs to `_`.
pub fn normalize_header(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut in_space = false;
    for c in label.chars() {
        if c.is_whitespace() {
            if !in_space {
                key.push('_');
            }
            in_space = true;
        } else {
            key.extend(c.to_lowercase());
            in_space = false;
        }
    }
    key
}

/// Turn raw sheet values (header row first) into records.
///
/// Rows shorter than the header yield empty strings for the missing fields.
pub fn parse_rows(values: &[Vec<String>]) -> Vec<Record> {
    let Some((header, rows)) = values.split_first() else {
        return Vec::new();
    };

    let keys: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();

    rows.iter()
        .map(|row| {
            Record(
                keys.iter()
                    .enumerate()
                    .map(|(i, key)| (key.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect(),
            )
        })
        .collect()
}

/// Decode a JSON-valued field, falling back to `T::default()`.
///
/// Empty and malformed values are both treated as "no data" so that a
/// partially broken row still renders.
pub fn decode_or_default<T: DeserializeOwned + Default>(field: &str, raw: &str) -> T {
    if raw.trim().is_empty() {
        return T::default();
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(field, error = %e, "Malformed JSON field, using default");
            T::default()
        }
    }
}

/// Decode a numeric field; empty or unparseable values become `None`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::debug!(value = raw, "Unparseable numeric field");
            None
        }
    }
}

/// Render a JSON cell the way the spreadsheet displays it.
pub fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A parsed A1-notation range such as `A1:Z1000` or `B5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct A1Range {
    /// Zero-based first column.
    pub start_col: usize,
    /// One-based first row.
    pub start_row: usize,
    pub end_col: Option<usize>,
    pub end_row: Option<usize>,
}

impl A1Range {
    pub fn parse(range: &str) -> Option<Self> {
        let (start, end) = match range.split_once(':') {
            Some((s, e)) => (s, Some(e)),
            None => (range, None),
        };

        let (start_col, start_row) = parse_cell(start)?;
        let start_row = start_row.unwrap_or(1);

        let (end_col, end_row) = match end {
            Some(e) => {
                let (c, r) = parse_cell(e)?;
                (Some(c), r)
            }
            None => (Some(start_col), Some(start_row)),
        };

        Some(Self {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}

/// Parse `B12` into (1, Some(12)) and `B` into (1, None).
fn parse_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    let col = letters_to_col(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().ok().filter(|r| *r > 0)?)
    };
    Some((col, row))
}

/// `A` → 0, `Z` → 25, `AA` → 26.
pub fn letters_to_col(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_uppercase() {
                return None;
            }
            acc.checked_mul(26)?
                .checked_add(c as usize - 'A' as usize + 1)
        })
        .map(|n| n - 1)
}

/// 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn col_to_letters(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_parse_rows_normalizes_headers() {
        let records = parse_rows(&rows(&[&["Id", "Full Name"], &["1", "Alice"]]));
        assert_eq!(records, vec![Record::from([("id", "1"), ("full_name", "Alice")])]);
    }

    #[test]
    fn test_parse_rows_pads_short_rows() {
        let records = parse_rows(&rows(&[&["Id", "Email", "Name"], &["u1"]]));
        assert_eq!(records[0].get("id"), "u1");
        assert_eq!(records[0].get("email"), "");
        assert_eq!(records[0].get("name"), "");
    }

    #[test]
    fn test_parse_rows_empty_input() {
        assert!(parse_rows(&[]).is_empty());
        assert!(parse_rows(&rows(&[&["Id"]])).is_empty());
    }

    #[test]
    fn test_normalize_header_collapses_whitespace() {
        assert_eq!(normalize_header("Email  Verified"), "email_verified");
        assert_eq!(normalize_header("CREATED AT"), "created_at");
        assert_eq!(normalize_header("stay_name"), "stay_name");
    }

    #[test]
    fn test_decode_or_default_degrades() {
        let flags: BTreeMap<String, bool> = decode_or_default("activities", "{\"bonfire\":true}");
        assert_eq!(flags.get("bonfire"), Some(&true));

        let broken: BTreeMap<String, bool> = decode_or_default("activities", "{bonfire");
        assert!(broken.is_empty());

        let empty: BTreeMap<String, bool> = decode_or_default("offerings", "");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1200"), Some(1200.0));
        assert_eq!(parse_price(" 450.5 "), Some(450.5));
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("ask host"), None);
    }

    #[test]
    fn test_a1_range_parse() {
        assert_eq!(
            A1Range::parse("A1:Z1000"),
            Some(A1Range {
                start_col: 0,
                start_row: 1,
                end_col: Some(25),
                end_row: Some(1000),
            })
        );
        assert_eq!(
            A1Range::parse("C7"),
            Some(A1Range {
                start_col: 2,
                start_row: 7,
                end_col: Some(2),
                end_row: Some(7),
            })
        );
        assert_eq!(A1Range::parse("A:B").map(|r| r.end_row), Some(None));
        assert!(A1Range::parse("7A").is_none());
    }

    #[test]
    fn test_a1_range_rejects_oversized_column() {
        assert!(A1Range::parse("AAAAAAAAAAAAAAAAAAAA1").is_none());
        assert!(A1Range::parse("A1:ZZZZZZZZZZZZZZZZZZZZ9").is_none());
        assert_eq!(letters_to_col("XFD"), Some(16383));
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(22), "W");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(letters_to_col("AA"), Some(26));
        assert_eq!(letters_to_col("w"), Some(22));
    }
}
