//! History commands - list, summarize and export the print ledger.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};

use mailprint_core::ledger::default_export_path;
use mailprint_core::{Config, Ledger, PrintRecord, PrintStatus, ReportAggregate};

use crate::cli::OutputFormat;

/// History subcommands.
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List print records, newest first.
    List(ListArgs),
    /// Show summary statistics.
    Stats(StatsArgs),
    /// Export records to CSV.
    Export(ExportArgs),
}

/// Arguments for `history list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Maximum number of records to show.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only show records with this status (success or failed).
    #[arg(long)]
    pub status: Option<PrintStatus>,

    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Arguments for `history stats`.
#[derive(Debug, Default, Args)]
pub struct StatsArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Arguments for `history export`.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Only export records with this status (success or failed).
    #[arg(long)]
    pub status: Option<PrintStatus>,

    /// Output file (defaults to a timestamped file in the reports directory).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Execute a history command.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read or the export cannot be written.
pub async fn execute(command: HistoryCommand, config: &Config) -> Result<()> {
    let ledger = Ledger::new(config.ledger_path());
    match command {
        HistoryCommand::List(args) => list(&ledger, &args).await,
        HistoryCommand::Stats(args) => stats(&ledger, args.format).await,
        HistoryCommand::Export(args) => export(&ledger, args, config).await,
    }
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Job ID")]
    job_id: String,
    #[tabled(rename = "PDF Size")]
    size: String,
    #[tabled(rename = "CSV Filename")]
    attachment: String,
    #[tabled(rename = "Link / Error")]
    detail: String,
}

impl From<&PrintRecord> for RecordRow {
    fn from(record: &PrintRecord) -> Self {
        Self {
            timestamp: record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: record.status.to_string(),
            job_id: record
                .submission_id
                .map_or_else(|| "N/A".to_string(), |id| id.to_string()),
            size: format_kb(record.payload_size_bytes),
            attachment: record.attachment_name.chars().take(30).collect(),
            detail: record
                .error_detail
                .as_ref()
                .map_or_else(|| record.target_link.clone(), |e| format!("Error: {e}")),
        }
    }
}

async fn list(ledger: &Ledger, args: &ListArgs) -> Result<()> {
    let records = ledger.query(args.limit, args.status).await?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No print history found");
                return Ok(());
            }

            let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
            println!("{}", Table::new(rows));

            let failed = records
                .iter()
                .filter(|r| r.status == PrintStatus::Failed)
                .count();
            println!(
                "Total records: {} ({} success, {} failed)",
                records.len(),
                (records.len() - failed).green(),
                failed.red()
            );
        }
    }

    Ok(())
}

async fn stats(ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let aggregate = ledger.aggregate().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&aggregate)?);
        }
        OutputFormat::Table => print_stats(&aggregate),
    }

    Ok(())
}

fn print_stats(aggregate: &ReportAggregate) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!(" Print History Statistics");
    println!("{rule}");
    println!("Total Prints:       {}", aggregate.total);
    println!(
        "Successful Prints:  {} ({:.1}%)",
        aggregate.successful.green(),
        aggregate.success_rate()
    );
    println!(
        "Failed Prints:      {} ({:.1}%)",
        aggregate.failed.red(),
        aggregate.failure_rate()
    );
    println!("Total PDF Size:     {} MB", aggregate.total_size_mb);
    println!();
    println!("Earliest Print:     {}", format_timestamp(aggregate.earliest));
    println!("Latest Print:       {}", format_timestamp(aggregate.latest));
    println!("{rule}");
}

async fn export(ledger: &Ledger, args: ExportArgs, config: &Config) -> Result<()> {
    let path = args
        .output
        .unwrap_or_else(|| default_export_path(&config.reports_dir(), Local::now()));
    let written = ledger.export_flattened(path, args.status).await?;
    println!(
        "{} Print history exported to: {}",
        "✓".green(),
        written.display()
    );
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_kb(bytes: u64) -> String {
    if bytes == 0 {
        "0 KB".to_string()
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

fn format_timestamp(timestamp: Option<DateTime<Local>>) -> String {
    timestamp.map_or_else(
        || "N/A".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
