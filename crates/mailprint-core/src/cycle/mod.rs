//! Mail-to-print processing cycle.
//!
//! A cycle fetches a batch of candidate messages, skips the ones already
//! handled, and drives each remaining message through attachment lookup,
//! CSV download, link extraction and print submission. Every message that
//! reaches a terminal state is marked handled; only print submissions are
//! written to the ledger.

mod capability;
mod processor;

pub use capability::{
    AttachmentRef, FailureNotice, InboundItem, MailSource, Notifier, PrintError, PrintSubmitter,
    Silent, SourceError, Submission,
};
pub use processor::{CycleSettings, CycleSummary, ItemOutcome, Processor};
