//! Secrets commands - manage keyring entries.

use std::io::BufRead;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;

use mailprint_core::Secret;
use mailprint_core::secrets::{delete_secret, get_secret, store_secret};

/// Secrets subcommands.
#[derive(Debug, Subcommand)]
pub enum SecretsCommand {
    /// Store a secret in the system keyring.
    Set(SetArgs),
    /// Remove a secret from the system keyring.
    Delete(DeleteArgs),
    /// Show which secrets are stored (values are never printed).
    List,
}

/// Arguments for `secrets set`.
#[derive(Debug, Args)]
pub struct SetArgs {
    /// Secret name: `printnode_api_key`, `gmail_client_secret` or
    /// `gmail_refresh_token`.
    pub key: Secret,

    /// Secret value. Read from one line of stdin when omitted.
    pub value: Option<String>,
}

/// Arguments for `secrets delete`.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Secret name.
    pub key: Secret,
}

/// Execute a secrets command.
///
/// # Errors
///
/// Returns an error if the keyring is unavailable or the value is empty.
pub fn execute(command: SecretsCommand) -> Result<()> {
    match command {
        SecretsCommand::Set(args) => {
            let value = read_value(args.value, std::io::stdin().lock())?;
            store_secret(args.key, &value)
                .with_context(|| format!("Failed to store {}", args.key))?;
            println!("{} Stored {} in keyring", "✓".green(), args.key);
        }
        SecretsCommand::Delete(args) => {
            delete_secret(args.key).with_context(|| format!("Failed to delete {}", args.key))?;
            println!("{} Removed {} from keyring", "✓".green(), args.key);
        }
        SecretsCommand::List => {
            for secret in Secret::ALL {
                let state = if get_secret(secret)?.is_some() {
                    "stored".green().to_string()
                } else {
                    "not set".dimmed().to_string()
                };
                println!("{secret:<22} {state}");
            }
        }
    }
    Ok(())
}

/// The explicit value, or the first line of `reader` with the line ending
/// and surrounding whitespace removed.
fn read_value(value: Option<String>, mut reader: impl BufRead) -> Result<String> {
    let value = match value {
        Some(value) => value,
        None => {
            let mut line = String::new();
            reader.read_line(&mut line).context("Failed to read secret from stdin")?;
            line
        }
    };

    let value = value.trim();
    if value.is_empty() {
        bail!("Secret value is empty");
    }
    Ok(value.to_string())
}
