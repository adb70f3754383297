//! Digest command - build and deliver the daily report.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use tracing::info;

use mailprint_core::{Config, DailyDigest, DigestSender, Ledger};

use super::gmail_client;

/// Arguments for the digest command.
#[derive(Debug, Args)]
pub struct DigestArgs {
    /// Print the digest instead of sending it.
    #[arg(long)]
    pub dry_run: bool,

    /// Recipient, overriding `DAILY_REPORT_EMAIL`.
    #[arg(long)]
    pub to: Option<String>,
}

/// Execute the digest command.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read, no recipient is
/// configured, or sending fails.
pub async fn execute(args: DigestArgs, config: &Config) -> Result<()> {
    let ledger = Ledger::new(config.ledger_path());
    let now = Local::now();

    if args.dry_run {
        let records = ledger.load().await?;
        let digest = DailyDigest::build(&records, now);
        println!("{}", digest.subject());
        println!();
        print!("{}", digest.render_text());
        return Ok(());
    }

    let to = args
        .to
        .or_else(|| config.daily_report_email.clone())
        .context("No recipient. Set DAILY_REPORT_EMAIL or use --to")?;
    let gmail = gmail_client(config).await?;
    deliver(&ledger, &gmail, &to, now).await
}

/// Builds today's digest from the ledger and sends it to `to`.
pub(crate) async fn deliver<D: DigestSender>(
    ledger: &Ledger,
    sender: &D,
    to: &str,
    now: DateTime<Local>,
) -> Result<()> {
    let records = ledger.load().await?;
    let digest = DailyDigest::build(&records, now);
    info!(
        "Sending daily report for {} ({} jobs today)",
        digest.date,
        digest.today.len()
    );
    sender
        .send_digest(to, &digest.subject(), &digest.render_html())
        .await?;
    Ok(())
}
