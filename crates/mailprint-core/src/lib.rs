//! # mailprint-core
//!
//! Core logic for the `MailPrint` mail-to-print poller.
//!
//! This crate provides:
//! - **Dedup Gate** - durable log of handled message identifiers
//! - **Print Ledger** - JSON record of every print submission, with query and CSV export
//! - **Link Extraction** - document link lookup in CSV attachments
//! - **Processing Cycle** - per-message state machine over pluggable mail and print capabilities
//! - **Reporting** - aggregate statistics and the daily digest
//! - Configuration from the environment, with keyring fallback for secrets

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod cycle;
pub mod dedup;
mod error;
pub mod extract;
pub mod ledger;
pub mod report;
pub mod secrets;

pub use config::Config;
pub use cycle::{
    AttachmentRef, CycleSettings, CycleSummary, FailureNotice, InboundItem, ItemOutcome,
    MailSource, Notifier, PrintError, PrintSubmitter, Processor, Silent, SourceError, Submission,
};
pub use dedup::DedupGate;
pub use error::{Error, Result};
pub use extract::{ColumnSelector, LinkExtractor};
pub use ledger::{Ledger, PrintRecord, PrintStatus};
pub use report::{DailyDigest, DigestSchedule, DigestSender, ReportAggregate};
pub use secrets::{CredentialError, CredentialResult, Secret};
