//! Summary statistics.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::ledger::{PrintRecord, PrintStatus};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Counts and totals over a set of print records. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportAggregate {
    /// Number of records.
    pub total: usize,
    /// Records with status `success`.
    pub successful: usize,
    /// Records with status `failed`.
    pub failed: usize,
    /// Summed payload size in MiB, rounded to 2 decimals.
    pub total_size_mb: f64,
    /// Oldest record timestamp.
    pub earliest: Option<DateTime<Local>>,
    /// Newest record timestamp.
    pub latest: Option<DateTime<Local>>,
}

impl ReportAggregate {
    /// Aggregate `records` in a single pass.
    #[must_use]
    pub fn from_records(records: &[PrintRecord]) -> Self {
        let mut aggregate = Self::default();
        let mut total_bytes: u64 = 0;

        for record in records {
            aggregate.total += 1;
            match record.status {
                PrintStatus::Success => aggregate.successful += 1,
                PrintStatus::Failed => aggregate.failed += 1,
            }
            total_bytes = total_bytes.saturating_add(record.payload_size_bytes);

            if aggregate.earliest.is_none_or(|t| record.timestamp < t) {
                aggregate.earliest = Some(record.timestamp);
            }
            if aggregate.latest.is_none_or(|t| record.timestamp > t) {
                aggregate.latest = Some(record.timestamp);
            }
        }

        aggregate.total_size_mb = bytes_to_mb(total_bytes);
        aggregate
    }

    /// Percentage of successful records (0.0 when empty).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        percentage(self.successful, self.total)
    }

    /// Percentage of failed records (0.0 when empty).
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        percentage(self.failed, self.total)
    }
}

/// Bytes to MiB, rounded to 2 decimals.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn test_empty_aggregate() {
        let aggregate = ReportAggregate::from_records(&[]);
        assert_eq!(aggregate.total, 0);
        assert_eq!(aggregate.successful, 0);
        assert_eq!(aggregate.failed, 0);
        assert_eq!(aggregate.total_size_mb, 0.0);
        assert!(aggregate.earliest.is_none());
        assert!(aggregate.latest.is_none());
        assert_eq!(aggregate.success_rate(), 0.0);
    }

    #[test]
    fn test_counts_size_and_bounds() {
        let records = vec![
            PrintRecord::success("a", "a.csv", "https://x", 1_048_576, 1).with_timestamp(at(10)),
            PrintRecord::success("b", "b.csv", "https://x", 524_288, 2).with_timestamp(at(0)),
            PrintRecord::failure("c", "c.csv", "https://x", 0, "e").with_timestamp(at(30)),
            PrintRecord::success("d", "d.csv", "https://x", 10_000, 3).with_timestamp(at(20)),
        ];

        let aggregate = ReportAggregate::from_records(&records);
        assert_eq!(aggregate.total, 4);
        assert_eq!(aggregate.successful, 3);
        assert_eq!(aggregate.failed, 1);
        // (1_048_576 + 524_288 + 10_000) / 1_048_576 = 1.50953...
        assert_eq!(aggregate.total_size_mb, 1.51);
        assert_eq!(aggregate.earliest, Some(at(0)));
        assert_eq!(aggregate.latest, Some(at(30)));
        assert_eq!(aggregate.success_rate(), 75.0);
        assert_eq!(aggregate.failure_rate(), 25.0);
    }

    #[test]
    fn test_mb_rounding() {
        assert_eq!(bytes_to_mb(0), 0.0);
        assert_eq!(bytes_to_mb(5_242), 0.0);
        assert_eq!(bytes_to_mb(5_243), 0.01);
        assert_eq!(bytes_to_mb(3 * 1_048_576), 3.0);
    }

    #[test]
    fn test_serializes_null_bounds() {
        let json = serde_json::to_value(ReportAggregate::from_records(&[])).unwrap();
        assert!(json["earliest"].is_null());
        assert_eq!(json["total"], 0);
    }
}
