//! Gmail REST client.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info, warn};

use mailprint_core::report::DigestSender;
use mailprint_core::{AttachmentRef, FailureNotice, InboundItem, MailSource, Notifier, SourceError};

use crate::auth::GoogleAuth;
use crate::error::{Error, Result};
use crate::mime::MimeBuilder;

/// Gmail API base for the authenticated user.
pub const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Per-request timeout for Gmail API calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gmail emits unpadded or padded base64url depending on the endpoint.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct MessagePart {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartBody {
    #[serde(default)]
    attachment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentBody {
    data: String,
}

/// Gmail API client for the authenticated mailbox.
///
/// Cloning is cheap; clones share the access token.
#[derive(Debug, Clone)]
pub struct GmailClient {
    auth: Arc<GoogleAuth>,
    base_url: String,
    notification_recipients: Vec<String>,
    request_timeout: Duration,
    http_client: Client,
}

impl GmailClient {
    /// Creates a client using `auth` for access tokens.
    #[must_use]
    pub fn new(auth: GoogleAuth) -> Self {
        Self {
            auth: Arc::new(auth),
            base_url: GMAIL_API_URL.to_string(),
            notification_recipients: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            http_client: Client::new(),
        }
    }

    /// Sets the timeout applied to every API request.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets who receives failure notifications.
    #[must_use]
    pub fn with_notification_recipients(mut self, recipients: Vec<String>) -> Self {
        self.notification_recipients = recipients;
        self
    }

    /// Confirms the credentials can obtain an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token refresh fails.
    pub async fn check_access(&self) -> Result<()> {
        self.auth.access_token().await?;
        info!("Gmail API access verified");
        Ok(())
    }

    /// Lists messages matching `subject:"<filter>" has:attachment` and fetches
    /// each one in full. Messages that fail to load are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing itself fails.
    pub async fn search_messages(
        &self,
        subject_filter: &str,
        max_results: usize,
    ) -> Result<Vec<InboundItem>> {
        let query = search_query(subject_filter);
        debug!("Searching emails with query: {query}");

        let max_results = max_results.to_string();
        let request = self
            .authorized(self.http_client.get(self.url("/messages")))
            .await?
            .query(&[("q", query.as_str()), ("maxResults", max_results.as_str())]);
        let list: ListResponse = json_body(request.send().await?).await?;
        info!("Found {} emails matching filter", list.messages.len());

        let mut items = Vec::with_capacity(list.messages.len());
        for message in list.messages {
            match self.get_message(&message.id).await {
                Ok(message) => items.push(inbound_item(message)),
                Err(e) => error!("Error fetching message {}: {e}", message.id),
            }
        }
        Ok(items)
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        self.get_json(&format!("/messages/{id}?format=full")).await
    }

    /// Downloads and decodes one attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the data is not base64url.
    pub async fn download_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Bytes> {
        let body: AttachmentBody = self
            .get_json(&format!("/messages/{message_id}/attachments/{attachment_id}"))
            .await?;
        decode_base64url(&body.data)
    }

    /// Removes the `UNREAD` label from a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn mark_as_read(&self, message_id: &str) -> Result<()> {
        let request = self
            .authorized(
                self.http_client
                    .post(self.url(&format!("/messages/{message_id}/modify"))),
            )
            .await?
            .json(&json!({ "removeLabelIds": ["UNREAD"] }));
        check(request.send().await?).await?;
        debug!("Marked message {message_id} as read");
        Ok(())
    }

    /// Sends an RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn send_message(&self, message: &MimeBuilder) -> Result<()> {
        let raw = BASE64_URL.encode(message.build());
        let request = self
            .authorized(self.http_client.post(self.url("/messages/send")))
            .await?
            .json(&json!({ "raw": raw }));
        check(request.send().await?).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(self.http_client.get(self.url(path))).await?;
        json_body(request.send().await?).await
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.auth.access_token().await?;
        Ok(request.bearer_auth(token).timeout(self.request_timeout))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl MailSource for GmailClient {
    async fn search(
        &self,
        filter: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<InboundItem>, SourceError> {
        Ok(self.search_messages(filter, max_results).await?)
    }

    async fn download(
        &self,
        item_id: &str,
        handle: &str,
    ) -> std::result::Result<Bytes, SourceError> {
        Ok(self.download_attachment(item_id, handle).await?)
    }

    async fn mark_read(&self, item_id: &str) -> std::result::Result<(), SourceError> {
        Ok(self.mark_as_read(item_id).await?)
    }
}

impl Notifier for GmailClient {
    async fn notify_failure(&self, notice: &FailureNotice) -> std::result::Result<(), SourceError> {
        if self.notification_recipients.is_empty() {
            warn!("No notification emails configured, skipping error notification");
            return Ok(());
        }

        let message = failure_message(notice, &self.notification_recipients);
        self.send_message(&message).await?;
        info!(
            "Error notification sent to {}",
            self.notification_recipients.join(", ")
        );
        Ok(())
    }
}

impl DigestSender for GmailClient {
    async fn send_digest(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> std::result::Result<(), SourceError> {
        let message = MimeBuilder::new(subject).to(to).html(html);
        self.send_message(&message).await?;
        info!("Daily report sent to {to}");
        Ok(())
    }
}

fn search_query(subject_filter: &str) -> String {
    format!(
        "subject:\"{}\" has:attachment",
        subject_filter.replace('"', "")
    )
}

fn inbound_item(message: Message) -> InboundItem {
    let mut attachments = Vec::new();
    if let Some(payload) = &message.payload {
        collect_attachments(&payload.parts, &mut attachments);
    }
    InboundItem::new(message.id, attachments)
}

/// Depth-first, so attachments keep their order in the message.
fn collect_attachments(parts: &[MessagePart], out: &mut Vec<AttachmentRef>) {
    for part in parts {
        let attachment_id = part.body.as_ref().and_then(|b| b.attachment_id.as_deref());
        if let (false, Some(id)) = (part.filename.is_empty(), attachment_id) {
            out.push(AttachmentRef::new(&part.filename, id));
        }
        collect_attachments(&part.parts, out);
    }
}

fn failure_message(notice: &FailureNotice, recipients: &[String]) -> MimeBuilder {
    let body = format!(
        "An error occurred while processing an email in the Printing Service.\n\n\
         Error Details:\n\
         --------------\n\
         {}\n\n\
         Email ID: {}\n\n\
         The problematic email attachment is included with this notification (if available).\n\n\
         ---\n\
         This is an automated notification from the Printing Service.\n",
        notice.message, notice.source_id
    );

    let mut message = MimeBuilder::new(format!(
        "Printing Service Error - Email ID: {}",
        notice.source_id
    ))
    .text(body);
    for recipient in recipients {
        message = message.to(recipient);
    }
    if let Some((filename, data)) = &notice.attachment {
        message = message.attach(filename, "application/octet-stream", data.clone());
    }
    message
}

fn decode_base64url(data: &str) -> Result<Bytes> {
    BASE64_URL
        .decode(data.trim())
        .map(Bytes::from)
        .map_err(|e| Error::InvalidResponse(format!("attachment data is not base64url: {e}")))
}

async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    Ok(check(response).await?.json().await?)
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}
