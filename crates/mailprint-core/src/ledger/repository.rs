//! Ledger storage.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use super::model::{PrintRecord, PrintStatus};
use crate::Result;
use crate::report::ReportAggregate;

/// JSON-file backed store of [`PrintRecord`]s.
///
/// The whole ordered collection is stored as one JSON array. Appends are a
/// read-modify-write of that array, written to a sibling temp file and renamed
/// over the original so readers never observe a half-written ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Create a ledger backed by the given file. The file is created lazily.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every stored record in write order.
    ///
    /// A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid ledger.
    pub async fn load(&self) -> Result<Vec<PrintRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    /// Append a record, preserving every previously stored record.
    ///
    /// A malformed ledger is never overwritten; the parse error is returned
    /// instead so the existing history survives for manual repair.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing ledger cannot be loaded or the
    /// updated ledger cannot be written.
    pub async fn append(&self, record: PrintRecord) -> Result<()> {
        let mut records = self.load().await?;
        debug!(
            "Appending {} record for {} to ledger ({} existing)",
            record.status,
            record.source_id,
            records.len()
        );
        records.push(record);
        self.save(&records).await
    }

    async fn save(&self, records: &[PrintRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(records)?;
        let tmp_path = self.temp_path();
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Query records, most recent first.
    ///
    /// Records with identical timestamps keep their stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be loaded.
    pub async fn query(
        &self,
        limit: Option<usize>,
        status: Option<PrintStatus>,
    ) -> Result<Vec<PrintRecord>> {
        let mut records = self.load().await?;

        if let Some(status) = status {
            records.retain(|r| r.status == status);
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if let Some(limit) = limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    /// Write the (optionally filtered) history as CSV, one row per record.
    ///
    /// With no matching records an empty file is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be loaded or the file cannot be written.
    pub async fn export_flattened(
        &self,
        path: impl Into<PathBuf>,
        status: Option<PrintStatus>,
    ) -> Result<PathBuf> {
        let path = path.into();
        let records = self.query(None, status).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if records.is_empty() {
            warn!("No print history to export");
            tokio::fs::write(&path, b"").await?;
            return Ok(path);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &records {
            writer.serialize(record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::Error::Io(e.into_error()))?;
        tokio::fs::write(&path, bytes).await?;

        info!("Exported {} print records to {}", records.len(), path.display());
        Ok(path)
    }

    /// Summary statistics over every stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be loaded.
    pub async fn aggregate(&self) -> Result<ReportAggregate> {
        let records = self.load().await?;
        Ok(ReportAggregate::from_records(&records))
    }
}

/// Default export location: `dir/print_history_YYYYMMDD_HHMMSS.csv`.
#[must_use]
pub fn default_export_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("print_history_{}.csv", now.format("%Y%m%d_%H%M%S")))
}
