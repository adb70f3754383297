//! Extract command - show the document link(s) a CSV report would print.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mailprint_core::{ColumnSelector, Config, LinkExtractor};

/// Arguments for the extract command.
#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// CSV file to read.
    pub path: PathBuf,

    /// Column holding the links, overriding `CSV_LINK_COLUMN`.
    #[arg(long)]
    pub column: Option<ColumnSelector>,

    /// List every link in the column instead of only the last row's.
    #[arg(long)]
    pub all: bool,
}

/// Execute the extract command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no link.
pub async fn execute(args: ExtractArgs, config: &Config) -> Result<()> {
    let data = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let column = args.column.unwrap_or(config.link_column);

    let links = links(&data, column, args.all);
    anyhow::ensure!(
        !links.is_empty(),
        "No document link found in column {column} of {}",
        args.path.display()
    );
    for link in links {
        println!("{link}");
    }
    Ok(())
}

fn links(data: &[u8], column: ColumnSelector, all: bool) -> Vec<String> {
    let extractor = LinkExtractor::new();
    if all {
        extractor.extract_all(data, column)
    } else {
        extractor.extract(data, column).into_iter().collect()
    }
}
