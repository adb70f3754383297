//! Reporting over the print ledger.
//!
//! Read-only: aggregate statistics and the daily digest.

mod aggregate;
mod digest;

use std::future::Future;

pub use aggregate::ReportAggregate;
pub use digest::{DailyDigest, DigestSchedule};

use crate::cycle::SourceError;

/// Delivers a rendered digest.
pub trait DigestSender {
    /// Send an HTML digest to `to`.
    fn send_digest(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;
}
