//! Job command - look up a submitted PrintNode job.

use anyhow::{Result, bail};
use clap::Args;
use tabled::{Table, Tabled};

use mailprint_core::Config;
use mailprint_printnode::PrintJob;

use super::printnode_client;
use crate::cli::OutputFormat;

/// Arguments for the job command.
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job id as recorded in the history.
    pub id: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn rows(job: &PrintJob) -> Vec<FieldRow> {
    let or_dash = |value: &str| {
        if value.is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        }
    };
    [
        ("ID", job.id.to_string()),
        ("Title", or_dash(&job.title)),
        ("State", or_dash(&job.state)),
        ("Content Type", or_dash(&job.content_type)),
        ("Source", or_dash(&job.source)),
        ("Created", or_dash(&job.create_timestamp)),
    ]
    .into_iter()
    .map(|(field, value)| FieldRow { field, value })
    .collect()
}

/// Execute the job command.
///
/// # Errors
///
/// Returns an error if the API key is missing, the request fails or the job
/// does not exist.
pub async fn execute(args: JobArgs, config: &Config) -> Result<()> {
    let client = printnode_client(config)?;
    let Some(job) = client.job_status(args.id).await? else {
        bail!("Print job {} not found", args.id);
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&job)?),
        OutputFormat::Table => println!("{}", Table::new(rows(&job))),
    }
    Ok(())
}
