#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Retrying HTTP delivery for the faultline error reporters.
//!
//! This crate holds the network plumbing that the reporters in `faultline`
//! are built on. Most users never touch it directly; it is public so that
//! custom reporters can reuse the same delivery semantics.
//!
//! # Overview
//!
//! - [`HttpRequest`] describes one outbound call. Its method is validated
//!   when the request is built, so an unsupported method is reported
//!   synchronously instead of being retried.
//! - [`HttpClient`] is the seam between delivery logic and the network.
//!   [`ReqwestClient`] is the production implementation; tests plug in
//!   scripted clients.
//! - [`Transport`] sends a request with a [`RetryPolicy`]: a bounded number
//!   of attempts, a fixed delay between them and a per-attempt timeout.
//!
//! A transport never fails its caller. When every attempt has failed, the
//! attempt history is logged as a single rootcause report and
//! [`Delivery::Failed`] is returned.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use faultline_transport::{HttpRequest, ReqwestClient, RetryPolicy, Transport};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ReqwestClient::new()?);
//! let transport = Transport::new(client, RetryPolicy::default());
//!
//! let request = HttpRequest::new("POST", "https://errors.example.com/ingest")?
//!     .header("Content-Type", "application/json")
//!     .body(r#"{"error":"boom"}"#);
//!
//! let delivery = transport.send(&request).await;
//! println!("delivered: {}", delivery.is_delivered());
//! # Ok(())
//! # }
//! ```

mod client;
mod method;
mod policy;
mod transport;

pub use client::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
pub use method::{HttpMethod, UnsupportedMethod};
pub use policy::RetryPolicy;
pub use transport::{AttemptError, Delivery, DeliveryFailed, Transport};
