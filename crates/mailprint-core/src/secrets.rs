//! Secret storage using the system keyring.
//!
//! Used as a fallback when a secret is not provided through the
//! environment:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use std::fmt;
use std::str::FromStr;

use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailprint";

/// Secrets the service knows how to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    /// PrintNode API key.
    PrintNodeApiKey,
    /// Google OAuth client secret.
    GmailClientSecret,
    /// Google OAuth refresh token.
    GmailRefreshToken,
}

impl Secret {
    /// Every known secret.
    pub const ALL: [Self; 3] = [
        Self::PrintNodeApiKey,
        Self::GmailClientSecret,
        Self::GmailRefreshToken,
    ];

    /// Keyring entry name.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PrintNodeApiKey => "printnode_api_key",
            Self::GmailClientSecret => "gmail_client_secret",
            Self::GmailRefreshToken => "gmail_refresh_token",
        }
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Secret {
    type Err = String;

    /// Accepts the keyring name with `_` or `-` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|secret| secret.key() == key)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|secret| secret.key()).collect();
                format!("unknown secret {s:?}, expected one of: {}", known.join(", "))
            })
    }
}

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Stores a secret in the system keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn store_secret(secret: Secret, value: &str) -> CredentialResult<()> {
    let entry = Entry::new(SERVICE_NAME, secret.key())?;
    entry.set_password(value)?;
    debug!("Stored {} in keyring", secret.key());
    Ok(())
}

/// Retrieves a secret from the system keyring.
///
/// A missing entry, or a platform without a keyring, yields `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn get_secret(secret: Secret) -> CredentialResult<Option<String>> {
    let entry = Entry::new(SERVICE_NAME, secret.key())?;
    match entry.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => {
            debug!("No {} found in keyring", secret.key());
            Ok(None)
        }
        Err(keyring::Error::PlatformFailure(e) | keyring::Error::NoStorageAccess(e)) => {
            warn!("Keyring unavailable while reading {}: {e}", secret.key());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes a secret from the keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails (except for missing entries).
pub fn delete_secret(secret: Secret) -> CredentialResult<()> {
    let entry = Entry::new(SERVICE_NAME, secret.key())?;
    match entry.delete_credential() {
        Ok(()) => {
            debug!("Deleted {} from keyring", secret.key());
            Ok(())
        }
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to delete {}: {e}", secret.key());
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    // These tests touch the real system keyring and are ignored by default.
    // Run manually with `cargo test -- --ignored`.

    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let keys = Secret::ALL.map(Secret::key);
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_parse_secret_names() {
        assert_eq!(
            "printnode_api_key".parse::<Secret>().unwrap(),
            Secret::PrintNodeApiKey
        );
        assert_eq!(
            "Gmail-Refresh-Token".parse::<Secret>().unwrap(),
            Secret::GmailRefreshToken
        );
        for secret in Secret::ALL {
            assert_eq!(secret.to_string().parse::<Secret>().unwrap(), secret);
        }
        let err = "smtp_password".parse::<Secret>().unwrap_err();
        assert!(err.contains("gmail_client_secret"));
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_get_delete() {
        store_secret(Secret::PrintNodeApiKey, "test_api_key_12345").unwrap();
        assert_eq!(
            get_secret(Secret::PrintNodeApiKey).unwrap().as_deref(),
            Some("test_api_key_12345")
        );
        delete_secret(Secret::PrintNodeApiKey).unwrap();
        assert_eq!(get_secret(Secret::PrintNodeApiKey).unwrap(), None);
    }
}
