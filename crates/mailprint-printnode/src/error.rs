//! Error types for PrintNode operations.

/// Result type alias for PrintNode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// PrintNode error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error status.
    #[error("PrintNode API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The document to print could not be fetched.
    #[error("Error downloading document from {url}: {message}")]
    Fetch {
        /// Document URL.
        url: String,
        /// Failure description.
        message: String,
    },

    /// The configured printer is not on the account.
    #[error("Printer ID {id} not found. Available IDs: {available:?}")]
    PrinterNotFound {
        /// Configured printer id.
        id: u64,
        /// Printer ids visible to the account.
        available: Vec<u64>,
    },
}

impl Error {
    /// Creates an API error from a status code and body.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}
