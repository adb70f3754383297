//! RFC 5322 message construction for outgoing mail.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chrono::Utc;

/// Maximum encoded line length (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

#[derive(Debug, Clone)]
struct Attachment {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// Builder for a plain, HTML or multipart message.
#[derive(Debug, Clone, Default)]
pub struct MimeBuilder {
    to: Vec<String>,
    subject: String,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
    boundary: Option<String>,
}

impl MimeBuilder {
    /// Creates a message with the given subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    /// Adds a base64-encoded attachment.
    #[must_use]
    pub fn attach(
        mut self,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        self.attachments.push(Attachment {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        });
        self
    }

    /// Fixes the multipart boundary prefix.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Builds the RFC 5322 formatted message.
    #[must_use]
    pub fn build(&self) -> String {
        let mut message = String::new();

        let _ = write!(message, "To: {}\r\n", header_safe(&self.to.join(", ")));
        let _ = write!(message, "Subject: {}\r\n", encode_header(&self.subject));
        message.push_str("MIME-Version: 1.0\r\n");

        if self.attachments.is_empty() {
            self.write_body(&mut message);
            return message;
        }

        let boundary = self.boundary("mixed");
        let _ = write!(
            message,
            "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
        );
        let _ = write!(message, "--{boundary}\r\n");
        self.write_body(&mut message);

        for attachment in &self.attachments {
            let filename = header_safe(&attachment.filename).replace('"', "'");
            let _ = write!(message, "\r\n--{boundary}\r\n");
            let _ = write!(
                message,
                "Content-Type: {}; name=\"{filename}\"\r\n",
                header_safe(&attachment.content_type)
            );
            let _ = write!(
                message,
                "Content-Disposition: attachment; filename=\"{filename}\"\r\n"
            );
            message.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
            message.push_str(&encode_wrapped(&attachment.data));
        }

        let _ = write!(message, "\r\n--{boundary}--\r\n");
        message
    }

    fn write_body(&self, out: &mut String) {
        match (&self.text, &self.html) {
            (Some(text), Some(html)) => {
                let boundary = self.boundary("alt");
                let _ = write!(
                    out,
                    "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
                );
                let _ = write!(out, "--{boundary}\r\n");
                write_text_part(out, "plain", text);
                let _ = write!(out, "\r\n--{boundary}\r\n");
                write_text_part(out, "html", html);
                let _ = write!(out, "\r\n--{boundary}--\r\n");
            }
            (None, Some(html)) => write_text_part(out, "html", html),
            (Some(text), None) => write_text_part(out, "plain", text),
            (None, None) => write_text_part(out, "plain", ""),
        }
    }

    fn boundary(&self, kind: &str) -> String {
        let prefix = self.boundary.clone().unwrap_or_else(|| {
            format!(
                "mailprint-{:x}",
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )
        });
        format!("{prefix}-{kind}")
    }
}

fn write_text_part(out: &mut String, subtype: &str, body: &str) {
    let _ = write!(out, "Content-Type: text/{subtype}; charset=utf-8\r\n");
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    out.push_str(&encode_wrapped(body.as_bytes()));
}

/// Base64 with CRLF line breaks every 76 characters.
fn encode_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut wrapped =
        String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        wrapped.push_str(&String::from_utf8_lossy(line));
        wrapped.push_str("\r\n");
    }
    wrapped
}

/// RFC 2047 B-encoding for non-ASCII header values.
fn encode_header(value: &str) -> String {
    let value = header_safe(value);
    if value.is_ascii() {
        value
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn header_safe(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_single_html_part() {
        let message = MimeBuilder::new("Daily Report")
            .to("ops@example.com")
            .html("<p>hi</p>")
            .build();

        assert!(message.starts_with("To: ops@example.com\r\nSubject: Daily Report\r\n"));
        assert!(message.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(message.contains(&STANDARD.encode("<p>hi</p>")));
        assert!(!message.contains("multipart"));
    }

    #[test]
    fn test_multipart_with_attachment() {
        let message = MimeBuilder::new("Printing Service Error")
            .to("a@example.com")
            .to("b@example.com")
            .text("details")
            .attach("batch.csv", "text/csv", Bytes::from_static(b"H1,H2\n"))
            .with_boundary("b0")
            .build();

        assert!(message.contains("To: a@example.com, b@example.com\r\n"));
        assert!(message.contains("Content-Type: multipart/mixed; boundary=\"b0-mixed\"\r\n"));
        assert!(message.contains("Content-Disposition: attachment; filename=\"batch.csv\"\r\n"));
        assert!(message.contains(&STANDARD.encode("H1,H2\n")));
        assert!(message.trim_end().ends_with("--b0-mixed--"));
    }

    #[test]
    fn test_text_and_html_are_alternatives() {
        let message = MimeBuilder::new("s")
            .text("plain")
            .html("<b>rich</b>")
            .with_boundary("b1")
            .build();
        assert!(message.contains("multipart/alternative; boundary=\"b1-alt\""));
        assert_eq!(message.matches("--b1-alt\r\n").count(), 2);
    }

    #[test]
    fn test_header_encoding_and_injection() {
        assert_eq!(encode_header("Report"), "Report");
        assert_eq!(
            encode_header("Résumé"),
            format!("=?utf-8?B?{}?=", STANDARD.encode("Résumé"))
        );
        assert_eq!(encode_header("a\r\nBcc: x"), "a  Bcc: x");
    }

    #[test]
    fn test_base64_lines_are_wrapped() {
        let wrapped = encode_wrapped(&[0u8; 200]);
        assert!(wrapped.lines().all(|line| line.len() <= MAX_LINE_LENGTH));
    }
}
