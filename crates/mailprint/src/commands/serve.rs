//! Serve command - the polling loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use mailprint_core::{Config, DedupGate, Ledger, Processor};
use mailprint_gmail::GmailClient;
use mailprint_printnode::PrintNodeClient;

use super::digest::deliver;
use super::{gmail_client, printnode_client};

/// Arguments for the serve command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Run a single processing cycle and exit.
    #[arg(long)]
    pub once: bool,
}

/// Execute the serve command.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or setup
/// verification fails. Cycle failures are logged, never returned.
pub async fn execute(args: ServeArgs, config: &Config) -> Result<()> {
    let rule = "=".repeat(60);
    info!("{rule}");
    info!("Mail-to-print service starting");
    info!("{rule}");

    config.validate()?;
    info!("Configuration validated successfully");

    let gmail = gmail_client(config).await?;
    let printer = printnode_client(config)?;
    verify_setup(&gmail, &printer).await?;

    let dedup = DedupGate::open(config.processed_log_path()).await?;
    let ledger = Ledger::new(config.ledger_path());
    let shutdown = Arc::new(AtomicBool::new(false));
    let wake = Arc::new(Notify::new());

    let mut processor = Processor::new(
        gmail.clone(),
        printer,
        dedup,
        ledger,
        config.cycle_settings(),
    )
    .with_notifier(gmail)
    .with_shutdown(Arc::clone(&shutdown));

    if args.once {
        processor.run_once(config.max_emails_per_cycle).await;
        return Ok(());
    }

    tokio::spawn(listen_for_shutdown(Arc::clone(&shutdown), Arc::clone(&wake)));

    info!(
        "Scheduling email processing every {} seconds",
        config.check_interval.as_secs()
    );
    if let Some(to) = &config.daily_report_email {
        info!(
            "Daily report to {to} scheduled at {}",
            config.daily_report_time.at.format("%H:%M")
        );
    }

    // A digest whose time already passed today is not sent on startup
    let mut last_digest: Option<NaiveDate> = {
        let now = Local::now();
        config
            .daily_report_time
            .due(now, None)
            .then(|| now.date_naive())
    };

    // The first tick completes immediately
    let mut interval = tokio::time::interval(config.check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Service is now running. Press Ctrl+C to stop.");
    loop {
        tokio::select! {
            () = wake.notified() => break,
            _ = interval.tick() => {}
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        processor.run_once(config.max_emails_per_cycle).await;

        if let Some(to) = &config.daily_report_email {
            let now = Local::now();
            if config.daily_report_time.due(now, last_digest) {
                last_digest = Some(now.date_naive());
                if let Err(e) = deliver(processor.ledger(), processor.source(), to, now).await {
                    error!("Failed to send daily report: {e}");
                }
            }
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }
    }

    info!("Service stopped");
    info!("{rule}");
    Ok(())
}

async fn verify_setup(gmail: &GmailClient, printer: &PrintNodeClient) -> Result<()> {
    info!("Verifying service setup...");
    printer
        .whoami()
        .await
        .context("PrintNode connection failed")?;
    printer
        .verify_printer()
        .await
        .context("Configured printer not found")?;
    gmail
        .check_access()
        .await
        .context("Gmail authentication failed")?;
    info!("All services verified successfully");
    Ok(())
}

async fn listen_for_shutdown(flag: Arc<AtomicBool>, wake: Arc<Notify>) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {e}");
                return;
            }
        }
        () = terminate => {}
    }

    info!("Received shutdown signal, shutting down gracefully...");
    flag.store(true, Ordering::SeqCst);
    wake.notify_one();
}
