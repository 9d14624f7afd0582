//! Pieces shared by the network reporters' wire formats.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Package name reported in payload metadata.
pub const PACKAGE: &str = env!("CARGO_PKG_NAME");

/// Package version reported in payload metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The `metadata` block of webhook payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct Metadata {
    pub(crate) platform: &'static str,
    pub(crate) package: &'static str,
    pub(crate) version: &'static str,
}

impl Metadata {
    pub(crate) fn current() -> Self {
        Self {
            platform: platform(),
            package: PACKAGE,
            version: VERSION,
        }
    }
}

/// The operating system the host application runs on.
pub(crate) fn platform() -> &'static str {
    std::env::consts::OS
}

/// Formats a timestamp the way every supported backend accepts it:
/// RFC 3339, UTC, millisecond precision.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
