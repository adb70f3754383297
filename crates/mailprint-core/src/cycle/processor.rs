//! The per-message state machine and batch loop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::capability::{
    AttachmentRef, FailureNotice, InboundItem, MailSource, Notifier, PrintSubmitter, Silent,
};
use crate::Result;
use crate::config::DEFAULT_SUBJECT_FILTER;
use crate::dedup::DedupGate;
use crate::extract::{ColumnSelector, LinkExtractor};
use crate::ledger::{Ledger, PrintRecord};

/// Terminal state of one message in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The message had no CSV attachment.
    NoAttachment,
    /// The CSV attachment could not be downloaded.
    DownloadFailed,
    /// The CSV held no usable document link.
    NoLink,
    /// The document fetch or print submission failed.
    PrintFailed,
    /// The print service accepted the job.
    Printed {
        /// Print job identifier.
        job_id: u64,
    },
}

impl ItemOutcome {
    /// Returns true for outcomes that reached print submission.
    #[must_use]
    pub const fn reached_submission(&self) -> bool {
        matches!(self, Self::PrintFailed | Self::Printed { .. })
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAttachment => f.write_str("no attachment"),
            Self::DownloadFailed => f.write_str("download failed"),
            Self::NoLink => f.write_str("no link"),
            Self::PrintFailed => f.write_str("print failed"),
            Self::Printed { job_id } => write!(f, "printed (job {job_id})"),
        }
    }
}

/// Counts reported at the end of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Messages returned by the search.
    pub seen: usize,
    /// Messages skipped as already handled.
    pub skipped: usize,
    /// Messages driven to a terminal state this cycle.
    pub processed: usize,
    /// Print jobs accepted.
    pub printed: usize,
    /// Print attempts that failed.
    pub print_failed: usize,
    /// Messages without a CSV attachment.
    pub no_attachment: usize,
    /// CSV downloads that failed.
    pub download_failed: usize,
    /// CSVs without a usable link.
    pub no_link: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: &ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::NoAttachment => self.no_attachment += 1,
            ItemOutcome::DownloadFailed => self.download_failed += 1,
            ItemOutcome::NoLink => self.no_link += 1,
            ItemOutcome::PrintFailed => self.print_failed += 1,
            ItemOutcome::Printed { .. } => self.printed += 1,
        }
    }
}

/// Settings that shape a cycle.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Subject text the mail search filters on.
    pub subject_filter: String,
    /// Column holding the document link.
    pub link_column: ColumnSelector,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            subject_filter: DEFAULT_SUBJECT_FILTER.to_string(),
            link_column: ColumnSelector::default(),
        }
    }
}

/// Runs processing cycles. Owns the dedup gate and is the ledger's only writer.
pub struct Processor<S, P, N = Silent> {
    source: S,
    printer: P,
    notifier: N,
    dedup: DedupGate,
    ledger: Ledger,
    extractor: LinkExtractor,
    settings: CycleSettings,
    shutdown: Arc<AtomicBool>,
}

impl<S, P> Processor<S, P, Silent>
where
    S: MailSource,
    P: PrintSubmitter,
{
    /// Creates a processor without failure notifications.
    #[must_use]
    pub fn new(
        source: S,
        printer: P,
        dedup: DedupGate,
        ledger: Ledger,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            printer,
            notifier: Silent,
            dedup,
            ledger,
            extractor: LinkExtractor::new(),
            settings,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<S, P, N> Processor<S, P, N>
where
    S: MailSource,
    P: PrintSubmitter,
    N: Notifier,
{
    /// Sends failure notices to `notifier`.
    #[must_use]
    pub fn with_notifier<M: Notifier>(self, notifier: M) -> Processor<S, P, M> {
        Processor {
            source: self.source,
            printer: self.printer,
            notifier,
            dedup: self.dedup,
            ledger: self.ledger,
            extractor: self.extractor,
            settings: self.settings,
            shutdown: self.shutdown,
        }
    }

    /// Stops a running cycle after its in-flight message once `flag` is set.
    #[must_use]
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// The dedup gate.
    #[must_use]
    pub const fn dedup(&self) -> &DedupGate {
        &self.dedup
    }

    /// The ledger this processor writes to.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The mail source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Run one cycle over up to `max_items` messages.
    ///
    /// Per-message failures never end the cycle early.
    ///
    /// # Errors
    ///
    /// Returns an error only if the mail search itself fails.
    pub async fn run_cycle(&mut self, max_items: usize) -> Result<CycleSummary> {
        info!("Starting email processing cycle");

        let items = self
            .source
            .search(&self.settings.subject_filter, max_items)
            .await?;

        let mut summary = CycleSummary {
            seen: items.len(),
            ..CycleSummary::default()
        };

        if items.is_empty() {
            info!("No new emails found");
            return Ok(summary);
        }

        for item in &items {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested, ending cycle before {}", item.id);
                break;
            }

            if self.dedup.is_handled(&item.id) {
                debug!("Email {} already processed, skipping", item.id);
                summary.skipped += 1;
                continue;
            }

            let outcome = self.process_item(item).await;
            summary.record(&outcome);
        }

        info!(
            "Processing complete: {} emails processed, {} documents printed ({} seen, {} skipped)",
            summary.processed, summary.printed, summary.seen, summary.skipped
        );
        Ok(summary)
    }

    /// Run one cycle, logging instead of returning a batch failure.
    pub async fn run_once(&mut self, max_items: usize) -> Option<CycleSummary> {
        match self.run_cycle(max_items).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Error during email processing: {e}");
                None
            }
        }
    }

    /// Drive one message to a terminal state and mark it handled.
    async fn process_item(&mut self, item: &InboundItem) -> ItemOutcome {
        info!("Processing email ID: {}", item.id);

        let outcome = match self.attempt(item).await {
            Ok(outcome) | Err(outcome) => outcome,
        };

        self.dedup.mark_handled(&item.id).await;

        if outcome.reached_submission() {
            if let Err(e) = self.source.mark_read(&item.id).await {
                warn!("Failed to mark email {} as read: {e}", item.id);
            }
        }

        debug!("Email {} finished: {outcome}", item.id);
        outcome
    }

    async fn attempt(&self, item: &InboundItem) -> std::result::Result<ItemOutcome, ItemOutcome> {
        let attachment = Self::select_attachment(item)?;
        let csv = self.download(item, attachment).await?;
        let link = self.extract_link(item, attachment, &csv).await?;
        Ok(self.print(item, attachment, &link, csv).await)
    }

    fn select_attachment(item: &InboundItem) -> std::result::Result<&AttachmentRef, ItemOutcome> {
        item.first_csv().ok_or_else(|| {
            warn!("No CSV attachments found in email {}", item.id);
            ItemOutcome::NoAttachment
        })
    }

    async fn download(
        &self,
        item: &InboundItem,
        attachment: &AttachmentRef,
    ) -> std::result::Result<Bytes, ItemOutcome> {
        info!("Processing CSV attachment: {}", attachment.filename);

        match self.source.download(&item.id, &attachment.handle).await {
            Ok(data) => Ok(data),
            Err(e) => {
                error!("Failed to download CSV attachment {}: {e}", attachment.filename);
                self.notify(item, format!("Failed to download CSV attachment: {e}"), None)
                    .await;
                Err(ItemOutcome::DownloadFailed)
            }
        }
    }

    async fn extract_link(
        &self,
        item: &InboundItem,
        attachment: &AttachmentRef,
        csv: &Bytes,
    ) -> std::result::Result<String, ItemOutcome> {
        let column = self.settings.link_column;
        if let Some(link) = self.extractor.extract(csv, column) {
            return Ok(link);
        }

        error!("No document link found in CSV column {column}");
        self.notify(
            item,
            format!("No document link found in CSV column {column}"),
            Some((attachment.filename.clone(), csv.clone())),
        )
        .await;
        Err(ItemOutcome::NoLink)
    }

    async fn print(
        &self,
        item: &InboundItem,
        attachment: &AttachmentRef,
        link: &str,
        csv: Bytes,
    ) -> ItemOutcome {
        info!("Printing document: {link}");
        let title = format!("Batch Order Report - {}", attachment.filename);

        let (record, outcome) = match self.printer.submit_from_url(link, &title).await {
            Ok(submission) => {
                info!(
                    "Successfully printed document. Job ID: {}",
                    submission.job_id
                );
                let record = PrintRecord::success(
                    &item.id,
                    &attachment.filename,
                    link,
                    submission.payload_size_bytes,
                    submission.job_id,
                );
                (
                    record,
                    ItemOutcome::Printed {
                        job_id: submission.job_id,
                    },
                )
            }
            Err(e) => {
                error!("Failed to print document: {e}");
                self.notify(
                    item,
                    format!("Failed to print document {link}: {e}"),
                    Some((attachment.filename.clone(), csv)),
                )
                .await;
                let record = PrintRecord::failure(
                    &item.id,
                    &attachment.filename,
                    link,
                    e.payload_size_bytes(),
                    e.to_string(),
                );
                (record, ItemOutcome::PrintFailed)
            }
        };

        if let Err(e) = self.ledger.append(record).await {
            error!("Failed to log print job to history: {e}");
        }

        outcome
    }

    async fn notify(
        &self,
        item: &InboundItem,
        message: String,
        attachment: Option<(String, Bytes)>,
    ) {
        let notice = FailureNotice {
            source_id: item.id.clone(),
            message,
            attachment,
        };
        if let Err(e) = self.notifier.notify_failure(&notice).await {
            warn!("Failed to send error notification for {}: {e}", item.id);
        }
    }
}
