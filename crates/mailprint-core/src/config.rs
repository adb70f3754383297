//! Service configuration.
//!
//! Settings come from environment variables. Secrets that are not set in
//! the environment can be resolved from the system keyring with
//! [`Config::resolve_secrets`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::cycle::CycleSettings;
use crate::extract::ColumnSelector;
use crate::report::DigestSchedule;
use crate::secrets::{self, Secret};
use crate::{Error, Result};

/// Default PrintNode API endpoint.
pub const DEFAULT_PRINTNODE_API_URL: &str = "https://api.printnode.com";

/// Default subject filter for the mail search.
pub const DEFAULT_SUBJECT_FILTER: &str = "Batch Order Shipment Report";

/// Runtime configuration for the poller and the history tools.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the ledger, identifier log, token cache and reports.
    pub data_dir: PathBuf,
    /// Subject text the mail search filters on.
    pub subject_filter: String,
    /// CSV column holding the document link.
    pub link_column: ColumnSelector,
    /// Time between processing cycles.
    pub check_interval: Duration,
    /// Maximum messages fetched per cycle.
    pub max_emails_per_cycle: usize,
    /// Timeout for fetching the document to print.
    pub fetch_timeout: Duration,
    /// PrintNode API key.
    pub printnode_api_key: Option<String>,
    /// PrintNode printer id.
    pub printnode_printer_id: Option<u64>,
    /// PrintNode API endpoint.
    pub printnode_api_url: String,
    /// Google OAuth client id.
    pub gmail_client_id: Option<String>,
    /// Google OAuth client secret.
    pub gmail_client_secret: Option<String>,
    /// Google OAuth refresh token.
    pub gmail_refresh_token: Option<String>,
    /// Recipient of the daily digest; the digest is disabled when unset.
    pub daily_report_email: Option<String>,
    /// When the daily digest goes out.
    pub daily_report_time: DigestSchedule,
    /// Recipients of failure notifications; disabled when empty.
    pub error_notification_emails: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            subject_filter: DEFAULT_SUBJECT_FILTER.to_string(),
            link_column: ColumnSelector::default(),
            check_interval: Duration::from_secs(60),
            max_emails_per_cycle: 20,
            fetch_timeout: Duration::from_secs(30),
            printnode_api_key: None,
            printnode_printer_id: None,
            printnode_api_url: DEFAULT_PRINTNODE_API_URL.to_string(),
            gmail_client_id: None,
            gmail_client_secret: None,
            gmail_refresh_token: None,
            daily_report_email: None,
            daily_report_time: DigestSchedule::new(
                chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            ),
            error_notification_emails: Vec::new(),
        }
    }
}

/// `<platform data dir>/mailprint`, or `./mailprint` when there is none.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailprint")
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` listing every variable that failed to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` listing every variable that failed to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(dir) = get("MAILPRINT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(filter) = get("EMAIL_SUBJECT_FILTER") {
            config.subject_filter = filter;
        }
        if let Some(column) = get("CSV_LINK_COLUMN") {
            match column.parse() {
                Ok(column) => config.link_column = column,
                Err(e) => errors.push(format!("CSV_LINK_COLUMN: {e}")),
            }
        }
        if let Some(secs) = get("CHECK_INTERVAL_SECONDS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => config.check_interval = Duration::from_secs(secs),
                _ => errors.push(format!(
                    "CHECK_INTERVAL_SECONDS must be a positive integer, got {secs:?}"
                )),
            }
        }
        if let Some(max) = get("MAX_EMAILS_PER_CYCLE") {
            match max.parse::<usize>() {
                Ok(max) if max > 0 => config.max_emails_per_cycle = max,
                _ => errors.push(format!(
                    "MAX_EMAILS_PER_CYCLE must be a positive integer, got {max:?}"
                )),
            }
        }
        if let Some(secs) = get("PRINT_FETCH_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => config.fetch_timeout = Duration::from_secs(secs),
                _ => errors.push(format!(
                    "PRINT_FETCH_TIMEOUT_SECS must be a positive integer, got {secs:?}"
                )),
            }
        }
        config.printnode_api_key = get("PRINTNODE_API_KEY");
        if let Some(id) = get("PRINTNODE_PRINTER_ID") {
            match id.parse::<u64>() {
                Ok(id) => config.printnode_printer_id = Some(id),
                Err(_) => errors.push(format!("PRINTNODE_PRINTER_ID must be numeric, got {id:?}")),
            }
        }
        if let Some(url) = get("PRINTNODE_API_URL") {
            config.printnode_api_url = url.trim_end_matches('/').to_string();
        }
        config.gmail_client_id = get("GMAIL_CLIENT_ID");
        config.gmail_client_secret = get("GMAIL_CLIENT_SECRET");
        config.gmail_refresh_token = get("GMAIL_REFRESH_TOKEN");
        config.daily_report_email = get("DAILY_REPORT_EMAIL");
        if let Some(time) = get("DAILY_REPORT_TIME") {
            match time.parse() {
                Ok(schedule) => config.daily_report_time = schedule,
                Err(e) => errors.push(format!("DAILY_REPORT_TIME: {e}")),
            }
        }
        if let Some(emails) = get("ERROR_NOTIFICATION_EMAILS") {
            config.error_notification_emails = emails
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(ToString::to_string)
                .collect();
        }

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(config_error(&errors))
        }
    }

    /// Fill unset secrets from the system keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring cannot be queried.
    pub fn resolve_secrets(&mut self) -> Result<()> {
        if self.printnode_api_key.is_none() {
            self.printnode_api_key = secrets::get_secret(Secret::PrintNodeApiKey)?;
        }
        if self.gmail_client_secret.is_none() {
            self.gmail_client_secret = secrets::get_secret(Secret::GmailClientSecret)?;
        }
        if self.gmail_refresh_token.is_none() {
            self.gmail_refresh_token = secrets::get_secret(Secret::GmailRefreshToken)?;
        }
        debug!("Resolved secrets from keyring where unset");
        Ok(())
    }

    /// Check that everything the poller needs is present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` listing every missing setting.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.printnode_api_key.is_none() {
            errors.push("PRINTNODE_API_KEY not set in environment or keyring".to_string());
        }
        if self.printnode_printer_id.is_none() {
            errors.push("PRINTNODE_PRINTER_ID not set in environment".to_string());
        }
        errors.extend(self.gmail_problems());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(config_error(&errors))
        }
    }

    /// Check that mailbox access is configured.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` listing every missing setting.
    pub fn validate_gmail(&self) -> Result<()> {
        let errors = self.gmail_problems();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(config_error(&errors))
        }
    }

    fn gmail_problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.gmail_client_id.is_none() {
            errors.push("GMAIL_CLIENT_ID not set in environment".to_string());
        }
        if self.gmail_refresh_token.is_none() && !self.token_path().exists() {
            errors.push(format!(
                "GMAIL_REFRESH_TOKEN not set and no cached token at {}",
                self.token_path().display()
            ));
        }
        errors
    }

    /// Settings for the processing cycle.
    #[must_use]
    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            subject_filter: self.subject_filter.clone(),
            link_column: self.link_column,
        }
    }

    /// Ledger file.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("print_history.json")
    }

    /// Handled-message identifier log.
    #[must_use]
    pub fn processed_log_path(&self) -> PathBuf {
        self.data_dir.join("processed_emails.txt")
    }

    /// Cached OAuth token.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("token.json")
    }

    /// Default directory for CSV exports.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// Data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn config_error(errors: &[String]) -> Error {
    let lines: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
    Error::Config(format!("Configuration errors:\n{}", lines.join("\n")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.subject_filter, DEFAULT_SUBJECT_FILTER);
        assert_eq!(config.link_column.to_string(), "C");
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.max_emails_per_cycle, 20);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.printnode_api_url, DEFAULT_PRINTNODE_API_URL);
        assert!(config.error_notification_emails.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MAILPRINT_DATA_DIR", "/srv/mailprint"),
            ("CSV_LINK_COLUMN", "d"),
            ("CHECK_INTERVAL_SECONDS", "15"),
            ("PRINTNODE_PRINTER_ID", "73001"),
            ("ERROR_NOTIFICATION_EMAILS", "ops@example.com, , lead@example.com"),
        ]))
        .unwrap();

        assert_eq!(config.ledger_path(), PathBuf::from("/srv/mailprint/print_history.json"));
        assert_eq!(
            config.processed_log_path(),
            PathBuf::from("/srv/mailprint/processed_emails.txt")
        );
        assert_eq!(config.link_column.index(), 3);
        assert_eq!(config.check_interval, Duration::from_secs(15));
        assert_eq!(config.printnode_printer_id, Some(73001));
        assert_eq!(config.error_notification_emails, ["ops@example.com", "lead@example.com"]);
    }

    #[test]
    fn test_parse_errors_are_collected() {
        let err = Config::from_lookup(lookup(&[
            ("CHECK_INTERVAL_SECONDS", "soon"),
            ("PRINTNODE_PRINTER_ID", "laser"),
        ]))
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("CHECK_INTERVAL_SECONDS"));
        assert!(message.contains("PRINTNODE_PRINTER_ID"));
    }

    #[test]
    fn test_validate_reports_missing_settings() {
        let config = Config {
            data_dir: PathBuf::from("/nonexistent/mailprint"),
            ..Config::default()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("PRINTNODE_API_KEY"));
        assert!(message.contains("PRINTNODE_PRINTER_ID"));
        assert!(message.contains("GMAIL_CLIENT_ID"));
    }

    #[test]
    fn test_validate_passes_when_complete() {
        let config = Config {
            printnode_api_key: Some("key".into()),
            printnode_printer_id: Some(1),
            gmail_client_id: Some("client".into()),
            gmail_refresh_token: Some("refresh".into()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
