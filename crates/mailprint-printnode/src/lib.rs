//! # mailprint-printnode
//!
//! Client for the [PrintNode](https://www.printnode.com) cloud printing API.
//!
//! ## Features
//!
//! - **Account checks**: `whoami`, printer listing and printer verification
//! - **Job submission**: base64 PDF jobs, directly or fetched from a URL
//! - **Job status**: look up a submitted job by id
//!
//! [`PrintNodeClient`] implements [`mailprint_core::PrintSubmitter`], so it
//! plugs straight into the processing cycle.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailprint_core::PrintSubmitter;
//! use mailprint_printnode::PrintNodeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PrintNodeClient::new("api_key", 73001)?;
//!     let printer = client.verify_printer().await?;
//!     println!("Printing to {}", printer.name);
//!
//!     let submission = client
//!         .submit_from_url("https://example.com/labels.pdf", "Labels")
//!         .await?;
//!     println!("Submitted job {}", submission.job_id);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod types;

pub use client::{DEFAULT_API_URL, JOB_SOURCE, PrintNodeClient};
pub use error::{Error, Result};
pub use types::{Computer, NewPrintJob, PrintJob, Printer, WhoAmI};
