//! Subcommand implementations.

pub mod digest;
pub mod extract;
pub mod history;
pub mod job;
pub mod printers;
pub mod secrets;
pub mod serve;

use anyhow::{Context, Result};
use mailprint_core::Config;
use mailprint_gmail::{GmailClient, GoogleAuth};
use mailprint_printnode::PrintNodeClient;

/// Builds the Gmail client from the configured credentials and token cache.
pub(crate) async fn gmail_client(config: &Config) -> Result<GmailClient> {
    config.validate_gmail()?;
    let client_id = config
        .gmail_client_id
        .clone()
        .context("GMAIL_CLIENT_ID not set in environment")?;

    let mut auth = GoogleAuth::from_cache(
        client_id,
        config.gmail_refresh_token.clone(),
        config.token_path(),
    )
    .await
    .context("Failed to load Gmail credentials")?;
    if let Some(secret) = &config.gmail_client_secret {
        auth = auth.with_client_secret(secret);
    }

    Ok(GmailClient::new(auth)
        .with_notification_recipients(config.error_notification_emails.clone()))
}

/// Builds the PrintNode client. `printer_id` falls back to 0 when unset.
pub(crate) fn printnode_client(config: &Config) -> Result<PrintNodeClient> {
    let api_key = config
        .printnode_api_key
        .clone()
        .context("PRINTNODE_API_KEY not set in environment or keyring")?;

    Ok(
        PrintNodeClient::new(api_key, config.printnode_printer_id.unwrap_or_default())?
            .with_base_url(&config.printnode_api_url)
            .with_fetch_timeout(config.fetch_timeout),
    )
}
