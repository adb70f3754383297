//! External capabilities consumed by the processing cycle.

use std::future::Future;

use bytes::Bytes;

/// Errors reported by the mail source (and by mail-based notifiers).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Transport failure talking to the mail API.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Authentication or token refresh failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body or description.
        message: String,
    },

    /// The API answered with data we could not decode.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// One attachment of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Attachment filename.
    pub filename: String,
    /// Opaque handle used to download the content.
    pub handle: String,
}

impl AttachmentRef {
    /// Creates a new attachment reference.
    #[must_use]
    pub fn new(filename: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            handle: handle.into(),
        }
    }

    /// Returns true for `.csv` attachments (case-insensitive).
    #[must_use]
    pub fn is_csv(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".csv")
    }
}

/// A candidate message for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundItem {
    /// Stable, unique message identifier; the dedup key.
    pub id: String,
    /// Attachments in message order.
    pub attachments: Vec<AttachmentRef>,
}

impl InboundItem {
    /// Creates a new inbound item.
    #[must_use]
    pub fn new(id: impl Into<String>, attachments: Vec<AttachmentRef>) -> Self {
        Self {
            id: id.into(),
            attachments,
        }
    }

    /// First CSV attachment, if any.
    #[must_use]
    pub fn first_csv(&self) -> Option<&AttachmentRef> {
        self.attachments.iter().find(|a| a.is_csv())
    }
}

/// Mailbox access.
pub trait MailSource {
    /// Messages matching `filter`, at most `max_results`, in source order.
    fn search(
        &self,
        filter: &str,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<InboundItem>, SourceError>> + Send;

    /// Download one attachment's content.
    fn download(
        &self,
        item_id: &str,
        handle: &str,
    ) -> impl Future<Output = Result<Bytes, SourceError>> + Send;

    /// Mark a message as read.
    fn mark_read(&self, item_id: &str) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// An accepted print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// Job identifier assigned by the print service.
    pub job_id: u64,
    /// Size of the submitted document.
    pub payload_size_bytes: u64,
}

/// Errors from document fetch or print submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrintError {
    /// The document could not be fetched.
    #[error("Error downloading document from {url}: {message}")]
    Fetch {
        /// Document URL.
        url: String,
        /// Failure description.
        message: String,
    },

    /// The print service rejected or failed the job.
    #[error("Error submitting print job: {message}")]
    Submit {
        /// Failure description.
        message: String,
        /// Size of the document that was being submitted.
        payload_size_bytes: u64,
    },
}

impl PrintError {
    /// Bytes fetched before the failure (0 if the fetch itself failed).
    #[must_use]
    pub const fn payload_size_bytes(&self) -> u64 {
        match self {
            Self::Fetch { .. } => 0,
            Self::Submit {
                payload_size_bytes, ..
            } => *payload_size_bytes,
        }
    }
}

/// Cloud print service.
pub trait PrintSubmitter {
    /// Submit document content, returning the job id.
    fn submit(
        &self,
        document: Bytes,
        title: &str,
    ) -> impl Future<Output = Result<u64, PrintError>> + Send;

    /// Fetch the document at `url` (bounded by a timeout) and submit it.
    fn submit_from_url(
        &self,
        url: &str,
        title: &str,
    ) -> impl Future<Output = Result<Submission, PrintError>> + Send;
}

/// Details of a message that could not be printed.
#[derive(Debug, Clone)]
pub struct FailureNotice {
    /// Identifier of the offending message.
    pub source_id: String,
    /// What went wrong.
    pub message: String,
    /// The CSV attachment, when it was downloaded.
    pub attachment: Option<(String, Bytes)>,
}

/// Receives failure notices from the cycle.
pub trait Notifier {
    /// Deliver one notice.
    fn notify_failure(
        &self,
        notice: &FailureNotice,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// Notifier that discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Notifier for Silent {
    async fn notify_failure(&self, _notice: &FailureNotice) -> Result<(), SourceError> {
        Ok(())
    }
}
