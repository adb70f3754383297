//! `MailPrint` - turns shipment-report emails into printed documents.
//!
//! Polls Gmail for matching messages, pulls the document link out of the
//! CSV attachment and submits it to a PrintNode printer. Every submission
//! is recorded in a JSON ledger that the `history` commands report on.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]
// CLI output goes through print! macros
#![allow(clippy::print_stdout)]

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailprint=info,mailprint_core=info,mailprint_gmail=info,mailprint_printnode=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Serve(args) => commands::serve::execute(args, &config).await,
            Commands::History(command) => commands::history::execute(command, &config).await,
            Commands::Printers => commands::printers::execute(&config).await,
            Commands::Digest(args) => commands::digest::execute(args, &config).await,
            Commands::Job(args) => commands::job::execute(args, &config).await,
            Commands::Extract(args) => commands::extract::execute(args, &config).await,
            Commands::Secrets(command) => commands::secrets::execute(command),
        }
    })
}
