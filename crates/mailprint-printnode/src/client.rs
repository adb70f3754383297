//! PrintNode REST client.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use mailprint_core::{PrintError, PrintSubmitter, Submission};

use crate::error::{Error, Result};
use crate::types::{NewPrintJob, PrintJob, Printer, WhoAmI};

/// Default PrintNode API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.printnode.com";

/// Value of the `source` field on submitted jobs.
pub const JOB_SOURCE: &str = "MailPrint Email Processor";

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Client bound to one API key and one target printer.
#[derive(Debug, Clone)]
pub struct PrintNodeClient {
    api_key: String,
    printer_id: u64,
    base_url: String,
    fetch_timeout: Duration,
    http_client: Client,
}

impl PrintNodeClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(api_key: impl Into<String>, printer_id: u64) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("mailprint/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            printer_id,
            base_url: DEFAULT_API_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            http_client,
        })
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the timeout for fetching documents by URL.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Target printer id.
    #[must_use]
    pub const fn printer_id(&self) -> u64 {
        self.printer_id
    }

    /// API endpoint.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks the API key against `GET /whoami`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the key is rejected.
    pub async fn whoami(&self) -> Result<WhoAmI> {
        let account: WhoAmI = self.get_json("/whoami").await?;
        info!(
            "PrintNode connection successful. User: {}",
            if account.firstname.is_empty() {
                "Unknown"
            } else {
                &account.firstname
            }
        );
        Ok(account)
    }

    /// Lists the printers visible to the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn printers(&self) -> Result<Vec<Printer>> {
        let printers: Vec<Printer> = self.get_json("/printers").await?;
        info!("Found {} printers", printers.len());
        Ok(printers)
    }

    /// Looks up the configured printer.
    ///
    /// # Errors
    ///
    /// Returns `Error::PrinterNotFound` if the account has no such printer.
    pub async fn verify_printer(&self) -> Result<Printer> {
        let printers = self.printers().await?;
        find_printer(printers, self.printer_id).inspect(|printer| {
            info!(
                "Printer '{}' is available (ID: {})",
                printer.name, self.printer_id
            );
        })
    }

    /// Submits a PDF to the configured printer, returning the job id.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is rejected.
    pub async fn print_document(&self, document: &[u8], title: &str) -> Result<u64> {
        let job = self.job_request(document, title);
        let response = self
            .http_client
            .post(self.url("/printjobs"))
            .basic_auth(&self.api_key, Some(""))
            .json(&job)
            .send()
            .await?;

        let job_id: u64 = check(response).await?.json().await?;
        info!("Print job submitted successfully. Job ID: {job_id}");
        Ok(job_id)
    }

    /// Fetches the document at `url` within the fetch timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` on transport failure, timeout or error status.
    pub async fn fetch_document(&self, url: &str) -> Result<Bytes> {
        let fetch_error = |message: String| Error::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .http_client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let document = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        info!("Downloaded PDF ({} bytes)", document.len());
        Ok(document)
    }

    /// Looks up a submitted job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn job_status(&self, job_id: u64) -> Result<Option<PrintJob>> {
        let jobs: Vec<PrintJob> = self.get_json(&format!("/printjobs/{job_id}")).await?;
        Ok(jobs.into_iter().next())
    }

    /// Builds the `POST /printjobs` body for a PDF.
    #[must_use]
    pub fn job_request(&self, document: &[u8], title: &str) -> NewPrintJob {
        NewPrintJob {
            printer_id: self.printer_id,
            title: title.to_string(),
            content_type: "pdf_base64".to_string(),
            content: STANDARD.encode(document),
            source: JOB_SOURCE.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {path}");
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl PrintSubmitter for PrintNodeClient {
    async fn submit(&self, document: Bytes, title: &str) -> std::result::Result<u64, PrintError> {
        self.print_document(&document, title).await.map_err(|e| {
            error!("Error submitting print job: {e}");
            PrintError::Submit {
                message: e.to_string(),
                payload_size_bytes: document.len() as u64,
            }
        })
    }

    async fn submit_from_url(
        &self,
        url: &str,
        title: &str,
    ) -> std::result::Result<Submission, PrintError> {
        info!("Attempting to print PDF from URL: {url}");
        let document = self.fetch_document(url).await.map_err(|e| {
            error!("{e}");
            PrintError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let job_id = self.submit(document.clone(), title).await?;
        Ok(Submission {
            job_id,
            payload_size_bytes: document.len() as u64,
        })
    }
}

fn find_printer(printers: Vec<Printer>, id: u64) -> Result<Printer> {
    let available: Vec<u64> = printers.iter().map(|p| p.id).collect();
    printers
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| {
            error!("Printer ID {id} not found. Available IDs: {available:?}");
            Error::PrinterNotFound { id, available }
        })
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::api(status.as_u16(), body))
}
