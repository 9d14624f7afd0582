#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Error reporting to one or many destinations, without ever getting in the
//! way of the application that reports.
//!
//! ## Overview
//!
//! An application catches an error, describes it as an [`ErrorRecord`] and
//! hands it to a [`Reporter`]. Reporters deliver records somewhere: the
//! diagnostic log, a generic HTTP endpoint, or an error-tracking service.
//! A [`CompositeReporter`] sends every record to several reporters at once.
//!
//! Reporting is best-effort. Network failures are retried according to the
//! reporter's policy, then logged through `tracing` and dropped. Nothing a
//! destination does can panic or stall the caller beyond the configured
//! timeouts.
//!
//! ## Quick Example
//!
//! ```no_run
//! use faultline::{Category, ErrorRecord, Reporter, Severity, presets};
//!
//! # async fn run() -> Result<(), faultline::ConfigError> {
//! let reporter = presets::development()
//!     .webhook_endpoint("http://localhost:3000/errors")
//!     .build()?;
//!
//! reporter.identify_user("user-42").ok();
//!
//! let record = ErrorRecord::from_message("checkout view failed", "at checkout()\nat app()")
//!     .with_severity(Severity::High)
//!     .with_category(Category::Rendering)
//!     .with_source("CheckoutView");
//! reporter.report(&record).await.ok();
//! # Ok(())
//! # }
//! ```
//!
//! ## Reporters
//!
//! | Reporter               | Destination                              | Attempts |
//! |------------------------|------------------------------------------|----------|
//! | [`NullReporter`]       | nowhere                                  | -        |
//! | [`ConsoleReporter`]    | `tracing`, target `faultline::console`   | -        |
//! | [`WebhookReporter`]    | any HTTP endpoint, JSON or query string  | 3        |
//! | [`SentryReporter`]     | a Sentry store endpoint                  | 1        |
//! | [`CrashlyticsReporter`]| the Crashlytics `reports:create` API     | 1        |
//!
//! Every reporter tracks its own end-user identity through
//! [`Reporter::identify_user`], [`Reporter::set_user_properties`] and
//! [`Reporter::clear_user`]. A composite forwards these calls to each child.
//!
//! ## Presets
//!
//! The [`presets`] module builds composites for common environments, and
//! [`config::PresetSelection`] picks one from environment variables.
//!
//! ## Features
//!
//! - `backtrace`: adds `ErrorRecord::capture`, which fills the trace from
//!   the current call stack.

mod composite;
pub mod config;
mod console;
mod crashlytics;
mod error;
mod payload;
pub mod presets;
mod record;
mod reporter;
mod sentry;
mod user;
mod webhook;

pub use faultline_transport as transport;
pub use rootcause::Report;

pub use self::{
    composite::{CompositeConfig, CompositeReporter, FanOutFailed, ReporterPanicked},
    console::ConsoleReporter,
    crashlytics::{CrashlyticsConfig, CrashlyticsReporter},
    error::ConfigError,
    payload::{PACKAGE, VERSION},
    record::{Category, ErrorRecord, Fields, MessageError, Severity},
    reporter::{NullReporter, Reporter},
    sentry::{Dsn, SentryConfig, SentryReporter},
    user::UserIdentity,
    webhook::{WebhookConfig, WebhookReporter},
};
