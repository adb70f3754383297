//! Duplicate suppression for inbound messages.
//!
//! The gate owns both the in-memory set of handled identifiers and the
//! line-oriented log it is rehydrated from. Lookups are set-based, so a
//! duplicate line in the log is harmless.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::Result;

/// Set of handled message identifiers mirrored to an append-only log.
#[derive(Debug)]
pub struct DedupGate {
    path: PathBuf,
    handled: HashSet<String>,
}

impl DedupGate {
    /// Open the gate, reading every identifier from the log at `path`.
    ///
    /// A missing log is an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let handled = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Loaded {} processed message ids from {}",
            handled.len(),
            path.display()
        );
        Ok(Self { path, handled })
    }

    /// Returns true if the identifier was already handled.
    #[must_use]
    pub fn is_handled(&self, id: &str) -> bool {
        self.handled.contains(id)
    }

    /// Record an identifier as handled.
    ///
    /// The set is always updated. A failure to persist the log line is
    /// logged and swallowed: the id may then be reprocessed after a restart.
    pub async fn mark_handled(&mut self, id: &str) {
        self.handled.insert(id.to_string());

        if let Err(e) = self.append_line(id).await {
            error!(
                "Failed to persist processed id {id} to {}: {e}",
                self.path.display()
            );
        } else {
            debug!("Marked {id} as processed");
        }
    }

    async fn append_line(&self, id: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{id}\n").as_bytes()).await?;
        file.flush().await
    }

    /// Number of handled identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handled.len()
    }

    /// Returns true if nothing has been handled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handled.is_empty()
    }

    /// Path of the identifier log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
