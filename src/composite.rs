//! Fan-out of every reporter operation to a fixed list of reporters.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use async_trait::async_trait;
use futures_util::{FutureExt, future::join_all};
use rootcause::{Report, report_collection::ReportCollection};

use crate::{
    record::{ErrorRecord, Fields},
    reporter::Reporter,
};

/// Dispatch policy of a [`CompositeReporter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeConfig {
    /// Keep going when a child fails. When `false`, a failure is returned
    /// from [`Reporter::report_with_context`].
    pub continue_on_failure: bool,
    /// Run all children concurrently instead of one after another.
    pub parallel: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            continue_on_failure: true,
            parallel: true,
        }
    }
}

/// A child reporter panicked while handling an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reporter `{reporter}` panicked: {message}")]
pub struct ReporterPanicked {
    /// Name of the reporter.
    pub reporter: String,
    /// The panic payload, if it was a string.
    pub message: String,
}

/// One or more children failed during a parallel fan-out.
///
/// The failures are the children of the report carrying this context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{failed} of {total} reporters failed")]
pub struct FanOutFailed {
    /// Number of children that failed.
    pub failed: usize,
    /// Number of children the record was sent to.
    pub total: usize,
}

/// Sends every operation to each of its reporters.
///
/// The list of reporters is fixed at construction. [`add_reporter`],
/// [`remove_reporter`] and [`with_settings`] return new composites and leave
/// the original untouched; the children themselves are shared.
///
/// Failures and panics of individual children never reach the caller unless
/// `continue_on_failure` is `false`, and even then only from
/// [`Reporter::report_with_context`]. User-tracking calls always succeed.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use faultline::{CompositeConfig, CompositeReporter, ConsoleReporter, NullReporter, Reporter};
///
/// let composite = CompositeReporter::with_config(
///     [
///         Arc::new(ConsoleReporter::new()) as Arc<dyn Reporter>,
///         Arc::new(NullReporter),
///     ],
///     CompositeConfig {
///         parallel: false,
///         ..CompositeConfig::default()
///     },
/// );
/// assert_eq!(composite.reporter_count(), 2);
/// assert!(composite.continue_on_failure());
/// assert!(!composite.parallel());
/// ```
///
/// [`add_reporter`]: CompositeReporter::add_reporter
/// [`remove_reporter`]: CompositeReporter::remove_reporter
/// [`with_settings`]: CompositeReporter::with_settings
#[derive(Clone)]
pub struct CompositeReporter {
    reporters: Arc<[Arc<dyn Reporter>]>,
    config: CompositeConfig,
}

impl CompositeReporter {
    /// A composite with the default policy: parallel, continue on failure.
    pub fn new(reporters: impl IntoIterator<Item = Arc<dyn Reporter>>) -> Self {
        Self::with_config(reporters, CompositeConfig::default())
    }

    /// A composite with an explicit policy.
    pub fn with_config(
        reporters: impl IntoIterator<Item = Arc<dyn Reporter>>,
        config: CompositeConfig,
    ) -> Self {
        Self {
            reporters: reporters.into_iter().collect(),
            config,
        }
    }

    /// The children, in dispatch order.
    pub fn reporters(&self) -> &[Arc<dyn Reporter>] {
        &self.reporters
    }

    /// Number of children.
    pub fn reporter_count(&self) -> usize {
        self.reporters.len()
    }

    /// The dispatch policy.
    pub fn config(&self) -> CompositeConfig {
        self.config
    }

    /// Whether child failures are absorbed.
    pub fn continue_on_failure(&self) -> bool {
        self.config.continue_on_failure
    }

    /// Whether children run concurrently.
    pub fn parallel(&self) -> bool {
        self.config.parallel
    }

    /// A new composite with `reporter` appended.
    #[must_use]
    pub fn add_reporter(&self, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporters: self.reporters.iter().cloned().chain([reporter]).collect(),
            config: self.config,
        }
    }

    /// A new composite without `reporter`.
    ///
    /// Reporters are compared by identity, so only the very same
    /// `Arc` (or a clone of it) is removed.
    #[must_use]
    pub fn remove_reporter(&self, reporter: &Arc<dyn Reporter>) -> Self {
        Self {
            reporters: self
                .reporters
                .iter()
                .filter(|r| !Arc::ptr_eq(r, reporter))
                .cloned()
                .collect(),
            config: self.config,
        }
    }

    /// A new composite with the same children and the given settings
    /// overridden. `None` keeps the current value.
    #[must_use]
    pub fn with_settings(&self, continue_on_failure: Option<bool>, parallel: Option<bool>) -> Self {
        Self {
            reporters: Arc::clone(&self.reporters),
            config: CompositeConfig {
                continue_on_failure: continue_on_failure.unwrap_or(self.config.continue_on_failure),
                parallel: parallel.unwrap_or(self.config.parallel),
            },
        }
    }

    async fn report_parallel(&self, record: &ErrorRecord, extra: &Fields) -> Result<(), Report> {
        let outcomes = join_all(
            self.reporters
                .iter()
                .map(|reporter| guarded_report(reporter.as_ref(), record, extra)),
        )
        .await;

        let mut failures: ReportCollection = ReportCollection::new();
        for (reporter, outcome) in self.reporters.iter().zip(outcomes) {
            if let Err(error) = outcome {
                if self.config.continue_on_failure {
                    tracing::warn!(reporter = reporter.name(), "reporter failed\n{error}");
                } else {
                    failures.push(error.into_cloneable());
                }
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        let failed = failures.len();
        Err(failures
            .context(FanOutFailed {
                failed,
                total: self.reporters.len(),
            })
            .into_dynamic())
    }

    async fn report_sequential(&self, record: &ErrorRecord, extra: &Fields) -> Result<(), Report> {
        for reporter in self.reporters.iter() {
            if let Err(error) = guarded_report(reporter.as_ref(), record, extra).await {
                if !self.config.continue_on_failure {
                    return Err(error);
                }
                tracing::warn!(reporter = reporter.name(), "reporter failed\n{error}");
            }
        }
        Ok(())
    }

    fn broadcast(&self, operation: &'static str, f: impl Fn(&dyn Reporter) -> Result<(), Report>) {
        for reporter in self.reporters.iter() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(reporter.as_ref())))
                .unwrap_or_else(|payload| Err(panicked(reporter.as_ref(), payload)));
            if let Err(error) = outcome {
                tracing::warn!(
                    reporter = reporter.name(),
                    operation,
                    "reporter failed\n{error}"
                );
            }
        }
    }
}

/// Runs one child's report call, turning a panic into an error.
async fn guarded_report(
    reporter: &dyn Reporter,
    record: &ErrorRecord,
    extra: &Fields,
) -> Result<(), Report> {
    let outcome = AssertUnwindSafe(async { reporter.report_with_context(record, extra).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panicked(reporter, payload)));
    match outcome {
        Ok(()) => Ok(()),
        Err(error) => Err(error.attach(format!("Reporter: {}", reporter.name()))),
    }
}

fn panicked(reporter: &dyn Reporter, payload: Box<dyn Any + Send>) -> Report {
    let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    };
    ReporterPanicked {
        reporter: reporter.name().to_owned(),
        message,
    }
    .into()
}

impl fmt::Debug for CompositeReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeReporter")
            .field(
                "reporters",
                &self.reporters.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl Reporter for CompositeReporter {
    fn name(&self) -> &str {
        "composite"
    }

    async fn report_with_context(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<(), Report> {
        if self.reporters.is_empty() {
            return Ok(());
        }
        if self.config.parallel {
            self.report_parallel(record, extra).await
        } else {
            self.report_sequential(record, extra).await
        }
    }

    fn identify_user(&self, id: &str) -> Result<(), Report> {
        self.broadcast("identify_user", |reporter| reporter.identify_user(id));
        Ok(())
    }

    fn set_user_properties(&self, properties: &Fields) -> Result<(), Report> {
        self.broadcast("set_user_properties", |reporter| {
            reporter.set_user_properties(properties)
        });
        Ok(())
    }

    fn clear_user(&self) -> Result<(), Report> {
        self.broadcast("clear_user", |reporter| reporter.clear_user());
        Ok(())
    }

    fn dispose(&self) {
        self.broadcast("dispose", |reporter| {
            reporter.dispose();
            Ok(())
        });
    }
}
