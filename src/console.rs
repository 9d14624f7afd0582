//! Reporter that writes records to the diagnostic log.

use std::{fmt, sync::OnceLock};

use async_trait::async_trait;
use rootcause::Report;

use crate::{
    payload,
    record::{ErrorRecord, Fields, Severity},
    reporter::Reporter,
    user::{UserIdentity, UserSlot},
};

/// Writes a human-readable summary of each record through `tracing`.
///
/// Events use the `faultline::console` target. Low severity records are
/// logged at `INFO`, medium at `WARN`, high and critical at `ERROR`.
///
/// # Environment Variables
///
/// - `FAULTLINE_CONSOLE` - Comma-separated options read by
///   [`ConsoleReporter::new`]:
///   - `trace` - Include the stack trace in every event
///   - `quiet` - Log every record at `DEBUG` regardless of severity
///
/// # Examples
///
/// ```
/// use faultline::{ConsoleReporter, ErrorRecord, Reporter};
///
/// # async fn run() {
/// let console = ConsoleReporter::new().with_trace(true);
/// let record = ErrorRecord::from_message("layout overflow", "build\nrender");
/// let _ = console.report(&record).await;
/// # }
/// ```
#[derive(Debug)]
pub struct ConsoleReporter {
    include_trace: bool,
    quiet: bool,
    user: UserSlot,
}

#[derive(Debug)]
struct ConsoleEnvOptions {
    include_trace: bool,
    quiet: bool,
}

impl ConsoleEnvOptions {
    fn get() -> &'static Self {
        static FAULTLINE_CONSOLE_FLAGS: OnceLock<ConsoleEnvOptions> = OnceLock::new();

        FAULTLINE_CONSOLE_FLAGS.get_or_init(|| {
            let mut options = ConsoleEnvOptions {
                include_trace: false,
                quiet: false,
            };

            if let Some(var) = std::env::var_os("FAULTLINE_CONSOLE") {
                for v in var.to_string_lossy().split(',') {
                    let v = v.trim();
                    if v.eq_ignore_ascii_case("trace") {
                        options.include_trace = true;
                    } else if v.eq_ignore_ascii_case("quiet") {
                        options.quiet = true;
                    }
                }
            }

            options
        })
    }
}

impl ConsoleReporter {
    /// Creates a console reporter configured from `FAULTLINE_CONSOLE`.
    pub fn new() -> Self {
        let env_options = ConsoleEnvOptions::get();
        Self {
            include_trace: env_options.include_trace,
            quiet: env_options.quiet,
            user: UserSlot::default(),
        }
    }

    /// Whether the stack trace is part of each event.
    #[must_use]
    pub fn with_trace(mut self, include_trace: bool) -> Self {
        self.include_trace = include_trace;
        self
    }

    /// Whether every record is logged at `DEBUG`.
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// The identity this reporter attributes records to.
    pub fn user(&self) -> UserIdentity {
        self.user.snapshot()
    }

    fn emit(&self, record: &ErrorRecord, extra: &Fields) {
        let user = self.user.snapshot();
        let summary = summarize(record, extra, &user, self.include_trace);
        let severity = record.severity();
        let category = record.category();
        let source = record.source().unwrap_or("-");
        let error_type = record.error_type();

        macro_rules! console_event {
            ($level:expr) => {
                tracing::event!(
                    target: "faultline::console",
                    $level,
                    %severity,
                    %category,
                    source,
                    error_type,
                    "{summary}"
                )
            };
        }

        if self.quiet {
            console_event!(tracing::Level::DEBUG);
            return;
        }
        match severity {
            Severity::Low => console_event!(tracing::Level::INFO),
            Severity::Medium => console_event!(tracing::Level::WARN),
            Severity::High | Severity::Critical => console_event!(tracing::Level::ERROR),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the multi-line summary written for one record.
fn summarize(
    record: &ErrorRecord,
    extra: &Fields,
    user: &UserIdentity,
    include_trace: bool,
) -> String {
    Summary {
        record,
        extra,
        user,
        include_trace,
    }
    .to_string()
}

struct Summary<'a> {
    record: &'a ErrorRecord,
    extra: &'a Fields,
    user: &'a UserIdentity,
    include_trace: bool,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record;
        write!(
            f,
            "[{}/{}] {}: {}",
            record.severity(),
            record.category(),
            record.error_type(),
            record.message()
        )?;
        if let Some(source) = record.source() {
            write!(f, "\n  source: {source}")?;
        }
        if let Some(at) = record.occurred_at() {
            write!(f, "\n  occurred at: {}", payload::format_timestamp(at))?;
        }
        if let Some(context) = record.context().filter(|c| !c.is_empty()) {
            write!(f, "\n  context: {}", render_fields(context))?;
        }
        if !self.extra.is_empty() {
            write!(f, "\n  extra: {}", render_fields(self.extra))?;
        }
        if let Some(user_data) = record.user_data().filter(|d| !d.is_empty()) {
            write!(f, "\n  user data: {}", render_fields(user_data))?;
        }
        if let Some(id) = &self.user.id {
            write!(f, "\n  user: {id}")?;
            if !self.user.properties.is_empty() {
                write!(f, " {}", render_fields(&self.user.properties))?;
            }
        }
        if self.include_trace && !record.trace().trim().is_empty() {
            f.write_str("\n  trace:")?;
            for line in record.trace().lines().filter(|l| !l.trim().is_empty()) {
                write!(f, "\n    {}", line.trim())?;
            }
        }
        Ok(())
    }
}

fn render_fields(fields: &Fields) -> String {
    serde_json::to_string(fields).unwrap_or_else(|_| format!("{fields:?}"))
}

#[async_trait]
impl Reporter for ConsoleReporter {
    fn name(&self) -> &str {
        "console"
    }

    async fn report_with_context(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<(), Report> {
        self.emit(record, extra);
        Ok(())
    }

    fn identify_user(&self, id: &str) -> Result<(), Report> {
        self.user.identify(id);
        Ok(())
    }

    fn set_user_properties(&self, properties: &Fields) -> Result<(), Report> {
        self.user.merge_properties(properties);
        Ok(())
    }

    fn clear_user(&self) -> Result<(), Report> {
        self.user.clear();
        Ok(())
    }
}
