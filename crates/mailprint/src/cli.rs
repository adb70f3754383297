//! Command-line definition.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mailprint_core::Config;

use crate::commands;

/// Mail-to-print poller and print history tools.
///
/// Settings are read from the environment (`PRINTNODE_API_KEY`,
/// `PRINTNODE_PRINTER_ID`, `GMAIL_CLIENT_ID`, ...). Secrets not set there
/// are looked up in the system keyring.
#[derive(Debug, Parser)]
#[command(name = "mailprint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the ledger, processed-id log, token cache and reports.
    #[arg(long, env = "MAILPRINT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective configuration: environment, keyring fallback, then flags.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if self.command.needs_secrets() {
            config.resolve_secrets()?;
        }
        Ok(config)
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the poller until interrupted.
    Serve(commands::serve::ServeArgs),
    /// Query, summarize or export the print history.
    #[command(subcommand)]
    History(commands::history::HistoryCommand),
    /// Show the PrintNode account and its printers.
    Printers,
    /// Build today's digest and send it (or print it with --dry-run).
    Digest(commands::digest::DigestArgs),
    /// Look up a submitted print job by id.
    Job(commands::job::JobArgs),
    /// Print the document link(s) a CSV report holds.
    Extract(commands::extract::ExtractArgs),
    /// Manage secrets stored in the system keyring.
    #[command(subcommand)]
    Secrets(commands::secrets::SecretsCommand),
}

impl Commands {
    /// Commands that only touch local files or the keyring itself.
    const fn needs_secrets(&self) -> bool {
        !matches!(self, Self::History(_) | Self::Extract(_) | Self::Secrets(_))
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table output.
    #[default]
    Table,
    /// JSON output.
    Json,
}
