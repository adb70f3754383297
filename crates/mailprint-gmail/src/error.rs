//! Error types for Gmail operations.

use std::io;

use mailprint_core::SourceError;

/// Result type alias for Gmail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Gmail error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (token cache).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `OAuth2` error from the token endpoint.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// No refresh token available.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Gmail API returned an error status.
    #[error("Gmail API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }
}

impl From<Error> for SourceError {
    fn from(err: Error) -> Self {
        match err {
            Error::OAuth { .. } | Error::NoRefreshToken => Self::Authentication(err.to_string()),
            Error::Api { status, message } => Self::Api { status, message },
            Error::Http(e) => Self::Connection(e.to_string()),
            Error::Io(e) => Self::Connection(e.to_string()),
            Error::Json(e) => Self::Malformed(e.to_string()),
            Error::InvalidResponse(msg) => Self::Malformed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_mapping() {
        assert!(matches!(
            SourceError::from(Error::oauth_error("invalid_grant", "Token has been revoked")),
            SourceError::Authentication(_)
        ));
        assert_eq!(
            SourceError::from(Error::Api {
                status: 404,
                message: "Not Found".into()
            }),
            SourceError::Api {
                status: 404,
                message: "Not Found".into()
            }
        );
        assert!(matches!(
            SourceError::from(Error::InvalidResponse("no data".into())),
            SourceError::Malformed(_)
        ));
    }
}
