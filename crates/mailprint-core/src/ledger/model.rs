//! Ledger data models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Outcome of a print submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintStatus {
    /// The print service accepted the job.
    Success,
    /// Fetching the document or submitting the job failed.
    Failed,
}

impl PrintStatus {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PrintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown print status: {other}")),
        }
    }
}

/// One row of the ledger: the outcome of a single print submission.
///
/// Records are append-only. Build them through [`PrintRecord::success`] or
/// [`PrintRecord::failure`] so that `error_detail` is present exactly when
/// the status is [`PrintStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintRecord {
    /// When the record was created.
    pub timestamp: DateTime<Local>,
    /// Identifier of the inbound message this record resulted from.
    pub source_id: String,
    /// Name of the processed attachment.
    pub attachment_name: String,
    /// Extracted document URL.
    pub target_link: String,
    /// Size of the fetched document (0 if never fetched).
    pub payload_size_bytes: u64,
    /// Job identifier returned by the print service.
    pub submission_id: Option<u64>,
    /// Submission outcome.
    pub status: PrintStatus,
    /// Failure cause; only set for failed submissions.
    pub error_detail: Option<String>,
}

impl PrintRecord {
    /// Creates a record for an accepted print job, stamped with the current time.
    #[must_use]
    pub fn success(
        source_id: impl Into<String>,
        attachment_name: impl Into<String>,
        target_link: impl Into<String>,
        payload_size_bytes: u64,
        submission_id: u64,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            source_id: source_id.into(),
            attachment_name: attachment_name.into(),
            target_link: target_link.into(),
            payload_size_bytes,
            submission_id: Some(submission_id),
            status: PrintStatus::Success,
            error_detail: None,
        }
    }

    /// Creates a record for a failed print attempt, stamped with the current time.
    #[must_use]
    pub fn failure(
        source_id: impl Into<String>,
        attachment_name: impl Into<String>,
        target_link: impl Into<String>,
        payload_size_bytes: u64,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            source_id: source_id.into(),
            attachment_name: attachment_name.into(),
            target_link: target_link.into(),
            payload_size_bytes,
            submission_id: None,
            status: PrintStatus::Failed,
            error_detail: Some(error_detail.into()),
        }
    }

    /// Overrides the record timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns true if the submission succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PrintStatus::Success
    }
}
