//! Daily digest of print activity.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Timelike};

use super::aggregate::ReportAggregate;
use crate::ledger::{PrintRecord, PrintStatus};

/// Most recent jobs listed in a digest.
const MAX_LISTED_JOBS: usize = 20;
const MAX_FILENAME_CHARS: usize = 40;
const MAX_ERROR_CHARS: usize = 100;

/// Today's print activity plus all-time totals.
#[derive(Debug, Clone)]
pub struct DailyDigest {
    /// Day the digest covers.
    pub date: NaiveDate,
    /// When the digest was built (end of the window).
    pub generated_at: DateTime<Local>,
    /// Records from `[midnight, generated_at)`, most recent first.
    pub today: Vec<PrintRecord>,
    /// Aggregate over `today`.
    pub today_stats: ReportAggregate,
    /// Aggregate over the whole ledger.
    pub overall: ReportAggregate,
}

impl DailyDigest {
    /// Build the digest for the local day containing `now`.
    #[must_use]
    pub fn build(records: &[PrintRecord], now: DateTime<Local>) -> Self {
        let start = local_midnight(now);

        let mut today: Vec<PrintRecord> = records
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp < now)
            .cloned()
            .collect();
        today.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Self {
            date: now.date_naive(),
            generated_at: now,
            today_stats: ReportAggregate::from_records(&today),
            overall: ReportAggregate::from_records(records),
            today,
        }
    }

    /// Returns true when nothing was printed today.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.today.is_empty()
    }

    /// Today's failed records.
    pub fn failed(&self) -> impl Iterator<Item = &PrintRecord> {
        self.today
            .iter()
            .filter(|r| r.status == PrintStatus::Failed)
    }

    /// Email subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        format!(
            "Print Service Daily Report - {}",
            self.date.format("%B %d, %Y")
        )
    }

    /// Plain-text rendering for terminals.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);
        let s = &self.today_stats;

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, " Daily Report - {}", self.date.format("%A, %B %d, %Y"));
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total Prints:   {}", s.total);
        let _ = writeln!(
            out,
            "Successful:     {} ({:.1}% success rate)",
            s.successful,
            s.success_rate()
        );
        let _ = writeln!(out, "Failed:         {}", s.failed);
        let _ = writeln!(out, "Total Size:     {} MB", s.total_size_mb);
        let _ = writeln!(out);

        if self.is_empty() {
            let _ = writeln!(out, "No print jobs today");
        } else {
            let _ = writeln!(
                out,
                "{:<10} {:<8} {:<40} {:>10}",
                "Time", "Status", "CSV File", "Size (KB)"
            );
            for record in self.today.iter().take(MAX_LISTED_JOBS) {
                let _ = writeln!(
                    out,
                    "{:<10} {:<8} {:<40} {:>10.1}",
                    record.timestamp.format("%H:%M:%S"),
                    record.status.as_str().to_uppercase(),
                    truncate(&record.attachment_name, MAX_FILENAME_CHARS),
                    kilobytes(record.payload_size_bytes),
                );
            }

            let failed: Vec<_> = self.failed().collect();
            if !failed.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "Failed prints:");
                for record in failed {
                    let _ = writeln!(
                        out,
                        "  {} {} - {}",
                        record.timestamp.format("%H:%M:%S"),
                        truncate(&record.attachment_name, MAX_FILENAME_CHARS),
                        truncate(error_of(record), MAX_ERROR_CHARS),
                    );
                }
            }
        }

        let o = &self.overall;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "All time: {} prints, {} successful, {} failed, {} MB",
            o.total, o.successful, o.failed, o.total_size_mb
        );
        let _ = writeln!(out, "{rule}");
        out
    }

    /// HTML rendering for the digest email.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        let s = &self.today_stats;

        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><style>\
             body{{font-family:Arial,sans-serif;max-width:800px;margin:0 auto;padding:20px}}\
             table{{width:100%;border-collapse:collapse}}\
             th{{background:#34495e;color:#fff;padding:8px;text-align:left}}\
             td{{padding:8px;border-bottom:1px solid #ddd}}\
             .success{{color:#28a745;font-weight:bold}}\
             .failed{{color:#dc3545;font-weight:bold}}\
             .no-data{{text-align:center;padding:40px;color:#95a5a6;font-style:italic}}\
             </style></head>\n<body>\n"
        );
        let _ = writeln!(html, "<h1>Print Service Daily Report</h1>");
        let _ = writeln!(html, "<p>{}</p>", self.date.format("%A, %B %d, %Y"));

        let _ = writeln!(html, "<h2>Today's Summary</h2>");
        let _ = writeln!(
            html,
            "<ul><li>Total prints: {}</li><li>Successful: {} ({:.1}% success rate)</li>\
             <li>Failed: {}</li><li>Total size: {} MB</li></ul>",
            s.total,
            s.successful,
            s.success_rate(),
            s.failed,
            s.total_size_mb
        );

        if self.is_empty() {
            let _ = writeln!(html, "<div class=\"no-data\">No print jobs today</div>");
        } else {
            let _ = writeln!(html, "<h2>Today's Print Jobs</h2>");
            let _ = writeln!(
                html,
                "<table><thead><tr>{}</tr></thead><tbody>",
                header_cells(&["Time", "Status", "CSV File", "Size (KB)"])
            );
            for record in self.today.iter().take(MAX_LISTED_JOBS) {
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td>{:.1}</td></tr>",
                    record.timestamp.format("%H:%M:%S"),
                    record.status,
                    record.status.as_str().to_uppercase(),
                    escape_html(&truncate(&record.attachment_name, MAX_FILENAME_CHARS)),
                    kilobytes(record.payload_size_bytes),
                );
            }
            let _ = writeln!(html, "</tbody></table>");

            let failed: Vec<_> = self.failed().collect();
            if !failed.is_empty() {
                let _ = writeln!(html, "<h2>Failed Prints Details</h2>");
                let _ = writeln!(
                    html,
                    "<table><thead><tr>{}</tr></thead><tbody>",
                    header_cells(&["Time", "CSV File", "Error Message"])
                );
                for record in failed {
                    let _ = writeln!(
                        html,
                        "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                        record.timestamp.format("%H:%M:%S"),
                        escape_html(&truncate(&record.attachment_name, MAX_FILENAME_CHARS)),
                        escape_html(&truncate(error_of(record), MAX_ERROR_CHARS)),
                    );
                }
                let _ = writeln!(html, "</tbody></table>");
            }
        }

        let o = &self.overall;
        let _ = writeln!(html, "<h2>Overall Statistics (All Time)</h2>");
        let _ = writeln!(
            html,
            concat!(
                "<ul><li>Total prints: {}</li><li>Successful: {}</li>",
                "<li>Failed: {}</li><li>Total size: {} MB</li></ul>"
            ),
            o.total,
            o.successful,
            o.failed,
            o.total_size_mb
        );
        let _ = writeln!(
            html,
            "<p style=\"color:#7f8c8d;font-size:12px\">Generated at {}</p>\n</body>\n</html>",
            self.generated_at.format("%I:%M %p")
        );
        html
    }
}

/// Once-a-day trigger for the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestSchedule {
    /// Local time of day the digest goes out.
    pub at: NaiveTime,
}

impl DigestSchedule {
    /// Creates a schedule firing at `at` local time.
    #[must_use]
    pub const fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// True once `now` has passed today's send time and today's digest
    /// has not gone out yet.
    #[must_use]
    pub fn due(&self, now: DateTime<Local>, last_sent: Option<NaiveDate>) -> bool {
        now.time() >= self.at && last_sent != Some(now.date_naive())
    }
}

impl FromStr for DigestSchedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
            .map(Self::new)
            .map_err(|e| format!("invalid report time {s:?}: {e}"))
    }
}

fn local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|t| t.and_local_timezone(Local).earliest())
        .unwrap_or_else(|| now - Duration::seconds(i64::from(now.num_seconds_from_midnight())))
}

fn error_of(record: &PrintRecord) -> &str {
    record.error_detail.as_deref().unwrap_or("Unknown error")
}

#[allow(clippy::cast_precision_loss)]
fn kilobytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn header_cells(names: &[&str]) -> String {
    names.iter().map(|name| format!("<th>{name}</th>")).collect()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
