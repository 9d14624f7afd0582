//! The reporter capability shared by every destination.

use async_trait::async_trait;
use rootcause::Report;

use crate::record::{ErrorRecord, Fields};

/// A destination for [`ErrorRecord`]s.
///
/// Reporting must never break the host application, so implementations log
/// and absorb delivery failures. The `Result` returned by each method exists
/// for composition and tests: the built-in reporters only return `Err` for
/// configuration mistakes detected at call time, such as an unsupported
/// HTTP method. Production call sites are expected to ignore it.
///
/// Every reporter keeps its own user identity. Identity set on one reporter
/// is never visible to another one.
///
/// # Examples
///
/// A reporter that counts records:
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use faultline::{ErrorRecord, Fields, Reporter};
/// use rootcause::Report;
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// #[async_trait::async_trait]
/// impl Reporter for Counter {
///     fn name(&self) -> &str {
///         "counter"
///     }
///
///     async fn report_with_context(&self, _: &ErrorRecord, _: &Fields) -> Result<(), Report> {
///         self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(())
///     }
///
///     fn identify_user(&self, _id: &str) -> Result<(), Report> {
///         Ok(())
///     }
///
///     fn set_user_properties(&self, _properties: &Fields) -> Result<(), Report> {
///         Ok(())
///     }
///
///     fn clear_user(&self) -> Result<(), Report> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Sends `record` without extra context.
    async fn report(&self, record: &ErrorRecord) -> Result<(), Report> {
        self.report_with_context(record, &Fields::new()).await
    }

    /// Sends `record` together with `extra` context.
    ///
    /// The extra context is added alongside the record's own context; it
    /// does not replace it.
    async fn report_with_context(&self, record: &ErrorRecord, extra: &Fields) -> Result<(), Report>;

    /// Sets the id of the current user.
    fn identify_user(&self, id: &str) -> Result<(), Report>;

    /// Merges `properties` into the current user's properties.
    fn set_user_properties(&self, properties: &Fields) -> Result<(), Report>;

    /// Forgets the current user.
    fn clear_user(&self) -> Result<(), Report>;

    /// Releases network resources. Must be idempotent; reporting after
    /// disposal is allowed but will not reach the network.
    fn dispose(&self) {}
}

/// A reporter that does nothing.
///
/// Useful as a default when reporting is switched off, and as a test
/// double.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullReporter;

#[async_trait]
impl Reporter for NullReporter {
    fn name(&self) -> &str {
        "null"
    }

    async fn report_with_context(
        &self,
        _record: &ErrorRecord,
        _extra: &Fields,
    ) -> Result<(), Report> {
        Ok(())
    }

    fn identify_user(&self, _id: &str) -> Result<(), Report> {
        Ok(())
    }

    fn set_user_properties(&self, _properties: &Fields) -> Result<(), Report> {
        Ok(())
    }

    fn clear_user(&self) -> Result<(), Report> {
        Ok(())
    }
}
