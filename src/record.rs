//! The value handed to reporters for each captured error.

use std::{error::Error, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Free-form metadata attached to records and user identities.
///
/// Insertion order is preserved so that payloads and log lines list keys in
/// the order the caller supplied them.
pub type Fields = IndexMap<String, serde_json::Value>;

/// How serious an error is.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or recoverable.
    Low,
    /// Degraded behavior.
    Medium,
    /// A feature is broken.
    #[default]
    High,
    /// The application cannot continue normally.
    Critical,
}

impl Severity {
    /// The lower-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the host application the error was raised.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// While a view was being built.
    Build,
    /// General runtime failure.
    Runtime,
    /// During layout or painting.
    Rendering,
    /// While applying a state update.
    State,
    /// In an external service or plugin.
    External,
    /// Not classified.
    #[default]
    Unknown,
}

impl Category {
    /// The lower-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Build => "build",
            Category::Runtime => "runtime",
            Category::Rendering => "rendering",
            Category::State => "state",
            Category::External => "external",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cause that only carries a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageError(pub String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for MessageError {}

/// One error occurrence.
///
/// A record is built once, with the `with_*` methods, and is read-only
/// afterwards. Cloning is cheap: the cause is shared.
///
/// # Examples
///
/// ```
/// use faultline::{Category, ErrorRecord, Severity};
///
/// let cause = std::io::Error::other("disk full");
/// let record = ErrorRecord::new(cause, "main\nsave_document")
///     .with_severity(Severity::Critical)
///     .with_category(Category::State)
///     .with_source("DocumentView");
///
/// assert_eq!(record.error_type(), "Error");
/// assert_eq!(record.message(), "disk full");
/// assert_eq!(record.source(), Some("DocumentView"));
/// ```
#[derive(Clone)]
pub struct ErrorRecord {
    cause: Arc<dyn Error + Send + Sync>,
    error_type: &'static str,
    trace: String,
    severity: Severity,
    category: Category,
    source: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    context: Option<Fields>,
    user_data: Option<Fields>,
}

impl ErrorRecord {
    /// Creates a record for `cause` with the given stack trace.
    ///
    /// The severity defaults to [`Severity::High`] and the category to
    /// [`Category::Unknown`].
    pub fn new<E>(cause: E, trace: impl Into<String>) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            cause: Arc::new(cause),
            error_type: short_type_name(std::any::type_name::<E>()),
            trace: trace.into(),
            severity: Severity::default(),
            category: Category::default(),
            source: None,
            occurred_at: None,
            context: None,
            user_data: None,
        }
    }

    /// Creates a record whose cause is a plain message.
    ///
    /// The error type of such a record is `"Error"`.
    pub fn from_message(message: impl Into<String>, trace: impl Into<String>) -> Self {
        let mut record = Self::new(MessageError(message.into()), trace);
        record.error_type = "Error";
        record
    }

    /// Creates a record for `cause`, capturing the current stack trace and
    /// stamping the current time.
    #[cfg(feature = "backtrace")]
    pub fn capture<E>(cause: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let trace = format!("{:?}", backtrace::Backtrace::new());
        Self::new(cause, trace).with_occurred_at(Utc::now())
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Names the component the error originated from.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets when the error occurred.
    #[must_use]
    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Attaches caller-supplied metadata, such as the current screen.
    #[must_use]
    pub fn with_context(mut self, context: Fields) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches user-linked metadata.
    #[must_use]
    pub fn with_user_data(mut self, user_data: Fields) -> Self {
        self.user_data = Some(user_data);
        self
    }

    /// The underlying error.
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.cause
    }

    /// The unqualified type name of the cause, e.g. `"ParseIntError"`.
    pub fn error_type(&self) -> &'static str {
        self.error_type
    }

    /// The display form of the cause.
    pub fn message(&self) -> String {
        self.cause.to_string()
    }

    /// The stack trace associated with the cause.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// The severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// The originating component, if known.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// When the error occurred, if known.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.occurred_at
    }

    /// Caller-supplied metadata.
    pub fn context(&self) -> Option<&Fields> {
        self.context.as_ref()
    }

    /// User-linked metadata.
    pub fn user_data(&self) -> Option<&Fields> {
        self.user_data.as_ref()
    }
}

impl fmt::Debug for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRecord")
            .field("error_type", &self.error_type)
            .field("message", &self.message())
            .field("severity", &self.severity)
            .field("category", &self.category)
            .field("source", &self.source)
            .field("occurred_at", &self.occurred_at)
            .field("context", &self.context)
            .field("user_data", &self.user_data)
            .finish_non_exhaustive()
    }
}

/// Strips module paths and generic arguments from a type name.
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}
