//! # mailprint-gmail
//!
//! Gmail access for the mail-to-print poller.
//!
//! ## Features
//!
//! - **Token management**: `OAuth2` refresh-token grant, expiry checking, on-disk token cache
//! - **Mailbox access**: subject search, attachment download, mark as read
//! - **Outgoing mail**: failure notifications and the daily digest, sent as raw RFC 5322
//!
//! [`GmailClient`] implements the [`mailprint_core::MailSource`],
//! [`mailprint_core::Notifier`] and [`mailprint_core::DigestSender`]
//! capabilities.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailprint_gmail::{GmailClient, GoogleAuth};
//!
//! #[tokio::main]
//! async fn main() -> mailprint_gmail::Result<()> {
//!     let auth = GoogleAuth::from_cache("client_id", None, "token.json")
//!         .await?
//!         .with_client_secret("client_secret");
//!     let gmail = GmailClient::new(auth);
//!
//!     for item in gmail.search_messages("Batch Order Shipment Report", 10).await? {
//!         println!("{} has {} attachments", item.id, item.attachments.len());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod auth;
mod client;
mod error;
pub mod mime;
pub mod token;

pub use auth::{GOOGLE_TOKEN_URL, GoogleAuth};
pub use client::{DEFAULT_REQUEST_TIMEOUT, GMAIL_API_URL, GmailClient};
pub use error::{Error, Result};
pub use mime::MimeBuilder;
pub use token::Token;
