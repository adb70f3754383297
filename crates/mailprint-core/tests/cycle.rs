//! Integration tests for the processing cycle.
//!
//! These tests drive a [`Processor`] against in-memory mail, print and
//! notification fakes, with the dedup log and ledger in a temp directory.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{Duration, Local, TimeZone};
use proptest::prelude::*;
use tempfile::TempDir;

use mailprint_core::{
    AttachmentRef, CycleSettings, DedupGate, FailureNotice, InboundItem, Ledger, MailSource,
    Notifier, PrintError, PrintRecord, PrintStatus, PrintSubmitter, Processor, SourceError,
    Submission,
};

const GOOD_CSV: &[u8] = b"H1,H2,PDF_Link\nA,B,https://x/doc1.pdf\nC,D,https://x/final.pdf";
const BAD_LINK_CSV: &[u8] = b"H1,H2,PDF_Link\nA,B,not_a_url";

#[derive(Default)]
struct SourceState {
    items: Vec<InboundItem>,
    content: HashMap<String, Result<Bytes, SourceError>>,
    search_error: Option<SourceError>,
    searches: usize,
    downloads: Vec<String>,
    marked_read: Vec<String>,
    mark_read_fails: bool,
}

/// Mail source serving a fixed inbox.
#[derive(Clone, Default)]
struct FakeSource {
    state: Arc<Mutex<SourceState>>,
}

impl FakeSource {
    fn with_csv(self, id: &str, filename: &str, csv: &'static [u8]) -> Self {
        let handle = format!("{id}-att");
        {
            let mut state = self.state.lock().unwrap();
            state.items.push(InboundItem::new(
                id,
                vec![AttachmentRef::new(filename, handle.clone())],
            ));
            state.content.insert(handle, Ok(Bytes::from_static(csv)));
        }
        self
    }

    fn with_item(self, item: InboundItem) -> Self {
        self.state.lock().unwrap().items.push(item);
        self
    }

    fn with_broken_download(self, id: &str) -> Self {
        let handle = format!("{id}-att");
        {
            let mut state = self.state.lock().unwrap();
            state.items.push(InboundItem::new(
                id,
                vec![AttachmentRef::new("report.csv", handle.clone())],
            ));
            state
                .content
                .insert(handle, Err(SourceError::Connection("reset by peer".into())));
        }
        self
    }

    fn failing_search(self) -> Self {
        self.state.lock().unwrap().search_error =
            Some(SourceError::Authentication("token revoked".into()));
        self
    }

    fn failing_mark_read(self) -> Self {
        self.state.lock().unwrap().mark_read_fails = true;
        self
    }

    fn downloads(&self) -> Vec<String> {
        self.state.lock().unwrap().downloads.clone()
    }

    fn marked_read(&self) -> Vec<String> {
        self.state.lock().unwrap().marked_read.clone()
    }
}

impl MailSource for FakeSource {
    async fn search(
        &self,
        _filter: &str,
        max_results: usize,
    ) -> Result<Vec<InboundItem>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.searches += 1;
        if let Some(e) = state.search_error.clone() {
            return Err(e);
        }
        Ok(state.items.iter().take(max_results).cloned().collect())
    }

    async fn download(&self, _item_id: &str, handle: &str) -> Result<Bytes, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.downloads.push(handle.to_string());
        state
            .content
            .get(handle)
            .cloned()
            .unwrap_or_else(|| Err(SourceError::Malformed(format!("unknown handle {handle}"))))
    }

    async fn mark_read(&self, item_id: &str) -> Result<(), SourceError> {
        let mut state = self.state.lock().unwrap();
        if state.mark_read_fails {
            return Err(SourceError::Api {
                status: 503,
                message: "backend unavailable".into(),
            });
        }
        state.marked_read.push(item_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct PrinterState {
    failing_urls: Vec<String>,
    submitted: Vec<(String, String)>,
    next_job: u64,
    trip_on_submit: Option<Arc<AtomicBool>>,
}

/// Print service that accepts everything except configured URLs.
#[derive(Clone, Default)]
struct FakePrinter {
    state: Arc<Mutex<PrinterState>>,
}

impl FakePrinter {
    fn failing_on(self, url: &str) -> Self {
        self.state.lock().unwrap().failing_urls.push(url.to_string());
        self
    }

    fn tripping(self, flag: Arc<AtomicBool>) -> Self {
        self.state.lock().unwrap().trip_on_submit = Some(flag);
        self
    }

    fn submitted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().submitted.clone()
    }
}

impl PrintSubmitter for FakePrinter {
    async fn submit(&self, _document: Bytes, _title: &str) -> Result<u64, PrintError> {
        let mut state = self.state.lock().unwrap();
        state.next_job += 1;
        Ok(state.next_job)
    }

    async fn submit_from_url(&self, url: &str, title: &str) -> Result<Submission, PrintError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push((url.to_string(), title.to_string()));
        if let Some(flag) = &state.trip_on_submit {
            flag.store(true, Ordering::SeqCst);
        }
        if state.failing_urls.iter().any(|u| u == url) {
            return Err(PrintError::Submit {
                message: "printer offline".into(),
                payload_size_bytes: 2048,
            });
        }
        state.next_job += 1;
        Ok(Submission {
            job_id: 9000 + state.next_job,
            payload_size_bytes: 4096,
        })
    }
}

/// Notifier that records every notice.
#[derive(Clone, Default)]
struct RecordingNotifier {
    notices: Arc<Mutex<Vec<FailureNotice>>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<FailureNotice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify_failure(&self, notice: &FailureNotice) -> Result<(), SourceError> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

async fn processor(
    dir: &TempDir,
    source: FakeSource,
    printer: FakePrinter,
) -> Processor<FakeSource, FakePrinter> {
    let dedup = DedupGate::open(dir.path().join("processed_emails.txt"))
        .await
        .unwrap();
    let ledger = Ledger::new(dir.path().join("print_history.json"));
    Processor::new(source, printer, dedup, ledger, CycleSettings::default())
}

#[tokio::test]
async fn test_printed_item_is_recorded_and_marked_read() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default().with_csv("m1", "batch.csv", GOOD_CSV);
    let printer = FakePrinter::default();
    let mut processor = processor(&dir, source.clone(), printer.clone()).await;

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.seen, 1);
    assert_eq!(summary.printed, 1);
    assert_eq!(
        printer.submitted(),
        [(
            "https://x/final.pdf".to_string(),
            "Batch Order Report - batch.csv".to_string()
        )]
    );
    assert_eq!(source.marked_read(), ["m1"]);

    let records = processor.ledger().load().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, PrintStatus::Success);
    assert_eq!(records[0].source_id, "m1");
    assert_eq!(records[0].submission_id, Some(9001));
    assert_eq!(records[0].payload_size_bytes, 4096);
}

#[tokio::test]
async fn test_second_cycle_skips_handled_items() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default().with_csv("m1", "batch.csv", GOOD_CSV);
    let mut processor = processor(&dir, source.clone(), FakePrinter::default()).await;

    processor.run_cycle(20).await.unwrap();
    let second = processor.run_cycle(20).await.unwrap();

    assert_eq!(second.seen, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.processed, 0);
    assert_eq!(source.downloads().len(), 1);
    assert_eq!(processor.ledger().load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_handled_items_survive_restart() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default().with_csv("m1", "batch.csv", GOOD_CSV);

    let mut first = processor(&dir, source.clone(), FakePrinter::default()).await;
    first.run_cycle(20).await.unwrap();
    drop(first);

    let mut restarted = processor(&dir, source.clone(), FakePrinter::default()).await;
    let summary = restarted.run_cycle(20).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(restarted.ledger().load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_submission_is_recorded_as_failed() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default().with_csv("m1", "batch.csv", GOOD_CSV);
    let printer = FakePrinter::default().failing_on("https://x/final.pdf");
    let notifier = RecordingNotifier::default();
    let mut processor = processor(&dir, source.clone(), printer)
        .await
        .with_notifier(notifier.clone());

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.print_failed, 1);
    assert!(processor.dedup().is_handled("m1"));
    assert_eq!(source.marked_read(), ["m1"]);

    let records = processor.ledger().load().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, PrintStatus::Failed);
    assert_eq!(records[0].submission_id, None);
    assert_eq!(records[0].payload_size_bytes, 2048);
    assert!(records[0].error_detail.as_deref().unwrap().contains("printer offline"));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].source_id, "m1");
    assert_eq!(notices[0].attachment.as_ref().unwrap().0, "batch.csv");
}

#[tokio::test]
async fn test_item_without_csv_is_handled_without_record() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default().with_item(InboundItem::new(
        "m1",
        vec![AttachmentRef::new("invoice.pdf", "h1")],
    ));
    let mut processor = processor(&dir, source.clone(), FakePrinter::default()).await;

    let summary = processor.run_cycle(20).await.unwrap();
    assert_eq!(summary.no_attachment, 1);
    assert!(processor.dedup().is_handled("m1"));
    assert!(processor.ledger().load().await.unwrap().is_empty());
    assert!(source.marked_read().is_empty());

    let again = processor.run_cycle(20).await.unwrap();
    assert_eq!(again.skipped, 1);
    assert!(source.downloads().is_empty());
}

#[tokio::test]
async fn test_invalid_link_is_handled_without_record() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default().with_csv("m1", "batch.csv", BAD_LINK_CSV);
    let printer = FakePrinter::default();
    let notifier = RecordingNotifier::default();
    let mut processor = processor(&dir, source, printer.clone())
        .await
        .with_notifier(notifier.clone());

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.no_link, 1);
    assert!(processor.dedup().is_handled("m1"));
    assert!(printer.submitted().is_empty());
    assert!(processor.ledger().load().await.unwrap().is_empty());
    assert_eq!(notifier.notices().len(), 1);
}

#[tokio::test]
async fn test_failures_do_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default()
        .with_broken_download("m1")
        .with_csv("m2", "empty.csv", b"H1,H2,PDF_Link\n")
        .with_csv("m3", "batch.csv", GOOD_CSV);
    let mut processor = processor(&dir, source, FakePrinter::default()).await;

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.download_failed, 1);
    assert_eq!(summary.no_link, 1);
    assert_eq!(summary.printed, 1);
    for id in ["m1", "m2", "m3"] {
        assert!(processor.dedup().is_handled(id));
    }
    assert_eq!(processor.ledger().load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_failure_aborts_cycle() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default()
        .with_csv("m1", "batch.csv", GOOD_CSV)
        .failing_search();
    let mut processor = processor(&dir, source.clone(), FakePrinter::default()).await;

    assert!(processor.run_cycle(20).await.is_err());
    assert!(processor.run_once(20).await.is_none());
    assert!(source.downloads().is_empty());
    assert!(processor.dedup().is_empty());
}

#[tokio::test]
async fn test_batch_limit_is_passed_to_search() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default()
        .with_csv("m1", "a.csv", GOOD_CSV)
        .with_csv("m2", "b.csv", GOOD_CSV)
        .with_csv("m3", "c.csv", GOOD_CSV);
    let mut processor = processor(&dir, source, FakePrinter::default()).await;

    let summary = processor.run_cycle(2).await.unwrap();
    assert_eq!(summary.seen, 2);
    assert_eq!(summary.printed, 2);
    assert!(!processor.dedup().is_handled("m3"));
}

#[tokio::test]
async fn test_shutdown_stops_after_in_flight_item() {
    let dir = TempDir::new().unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let source = FakeSource::default()
        .with_csv("m1", "a.csv", GOOD_CSV)
        .with_csv("m2", "b.csv", GOOD_CSV);
    let printer = FakePrinter::default().tripping(Arc::clone(&flag));
    let mut processor = processor(&dir, source, printer)
        .await
        .with_shutdown(Arc::clone(&flag));

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert!(processor.dedup().is_handled("m1"));
    assert!(!processor.dedup().is_handled("m2"));
    assert_eq!(processor.ledger().load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ledger_write_failure_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let ledger_path = dir.path().join("print_history.json");
    tokio::fs::write(&ledger_path, "{not json").await.unwrap();

    let source = FakeSource::default()
        .with_csv("m1", "a.csv", GOOD_CSV)
        .with_csv("m2", "b.csv", GOOD_CSV);
    let printer = FakePrinter::default();
    let mut processor = processor(&dir, source.clone(), printer.clone()).await;

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.seen, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.printed, 2);
    assert_eq!(printer.submitted().len(), 2);
    assert!(processor.dedup().is_handled("m1"));
    assert!(processor.dedup().is_handled("m2"));
    assert_eq!(source.marked_read(), ["m1", "m2"]);
    assert_eq!(
        tokio::fs::read_to_string(&ledger_path).await.unwrap(),
        "{not json"
    );
}

#[tokio::test]
async fn test_identifier_log_write_failure_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("processed_emails.txt");
    let dedup = DedupGate::open(&log_path).await.unwrap();
    // A directory in place of the log makes every append fail
    tokio::fs::create_dir(&log_path).await.unwrap();

    let source = FakeSource::default()
        .with_csv("m1", "a.csv", GOOD_CSV)
        .with_csv("m2", "b.csv", GOOD_CSV);
    let ledger = Ledger::new(dir.path().join("print_history.json"));
    let mut processor = Processor::new(
        source,
        FakePrinter::default(),
        dedup,
        ledger,
        CycleSettings::default(),
    );

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.printed, 2);
    assert!(processor.dedup().is_handled("m1"));
    assert!(processor.dedup().is_handled("m2"));
    assert_eq!(processor.ledger().load().await.unwrap().len(), 2);

    let again = processor.run_cycle(20).await.unwrap();
    assert_eq!(again.skipped, 2);
}

#[tokio::test]
async fn test_mark_read_failure_keeps_printed_outcome() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::default()
        .with_csv("m1", "batch.csv", GOOD_CSV)
        .failing_mark_read();
    let mut processor = processor(&dir, source.clone(), FakePrinter::default()).await;

    let summary = processor.run_cycle(20).await.unwrap();

    assert_eq!(summary.printed, 1);
    assert_eq!(summary.print_failed, 0);
    assert!(source.marked_read().is_empty());
    assert!(processor.dedup().is_handled("m1"));

    let records = processor.ledger().load().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, PrintStatus::Success);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_query_returns_every_appended_record_newest_first(
        offsets in proptest::collection::vec(0i64..10_000, 0..15)
    ) {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path().join("print_history.json"));
        let base = Local.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        let stored = tokio_test::block_on(async {
            for (i, offset) in offsets.iter().enumerate() {
                let record = PrintRecord::success(
                    format!("m{i}"),
                    "batch.csv",
                    "https://x/doc.pdf",
                    100,
                    i as u64,
                )
                .with_timestamp(base + Duration::seconds(*offset));
                ledger.append(record).await.unwrap();
            }
            ledger.query(None, None).await.unwrap()
        });

        prop_assert_eq!(stored.len(), offsets.len());
        prop_assert!(stored.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let mut ids: Vec<_> = stored.iter().map(|r| r.source_id.clone()).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), offsets.len());
    }
}
