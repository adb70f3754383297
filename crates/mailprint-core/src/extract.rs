//! Document link extraction from CSV attachments.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, error, info, warn};

/// Spreadsheet-style column selector (`A` is the first column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelector(usize);

impl ColumnSelector {
    /// Selector for a zero-based column index.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based column index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Default for ColumnSelector {
    /// Column `C`.
    fn default() -> Self {
        Self(2)
    }
}

impl FromStr for ColumnSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letters = s.trim();
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("invalid column selector: {s:?}"));
        }

        // Bijective base-26: A=1 .. Z=26, AA=27.
        let mut number = 0usize;
        for c in letters.chars() {
            let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
            number = number
                .checked_mul(26)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(|| format!("column selector out of range: {s:?}"))?;
        }
        Ok(Self(number - 1))
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = self.0 + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
            n = (n - 1) / 26;
        }
        letters.iter().rev().try_for_each(|c| write!(f, "{c}"))
    }
}

/// Pulls document URLs out of CSV attachments.
///
/// The first row is a header. Values are trimmed and accepted only when they
/// start with `http://` or `https://`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkExtractor;

impl LinkExtractor {
    /// Creates a new extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Link from the last data row of `column`, if that value is a URL.
    #[must_use]
    pub fn extract(&self, csv_data: &[u8], column: ColumnSelector) -> Option<String> {
        let rows = match read_column(csv_data, column) {
            Ok(rows) => rows,
            Err(e) => {
                error!("Error parsing CSV: {e}");
                return None;
            }
        };

        let Some(last) = rows.last() else {
            warn!("CSV file has no data rows");
            return None;
        };

        let Some(value) = last.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            warn!("Last row in column {column} is empty");
            return None;
        };

        if !is_link(value) {
            warn!("Value in last row doesn't look like a URL: {value}");
            return None;
        }

        info!("Extracted document link from column {column}: {value}");
        Some(value.to_string())
    }

    /// Every URL found in `column`, in row order.
    #[must_use]
    pub fn extract_all(&self, csv_data: &[u8], column: ColumnSelector) -> Vec<String> {
        let rows = match read_column(csv_data, column) {
            Ok(rows) => rows,
            Err(e) => {
                error!("Error parsing CSV: {e}");
                return Vec::new();
            }
        };

        let links: Vec<String> = rows
            .into_iter()
            .flatten()
            .map(|v| v.trim().to_string())
            .filter(|v| is_link(v))
            .collect();

        info!("Found {} document links in column {column}", links.len());
        links
    }
}

fn is_link(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Reads one column of every data row. `None` marks a row too short to
/// have the column.
fn read_column(csv_data: &[u8], column: ColumnSelector) -> Result<Vec<Option<String>>, String> {
    let data = csv_data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(csv_data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let Some(name) = headers.get(column.index()) else {
        return Err(format!(
            "column {column} does not exist (only {} columns found)",
            headers.len()
        ));
    };
    debug!("Reading from column: {name}");

    reader
        .records()
        .filter(|record| {
            record
                .as_ref()
                .map_or(true, |r| r.iter().any(|field| !field.trim().is_empty()))
        })
        .map(|record| {
            record
                .map(|r| r.get(column.index()).map(ToString::to_string))
                .map_err(|e| e.to_string())
        })
        .collect()
}
