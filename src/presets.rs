//! Ready-made reporter setups for common environments.
//!
//! Each preset is a small builder. Required settings are arguments of the
//! function that starts it, optional ones are chained methods, and `build`
//! creates the reporters:
//!
//! ```no_run
//! use faultline::presets;
//!
//! # fn run() -> Result<(), faultline::ConfigError> {
//! let reporter = presets::staging("https://key@sentry.example.com/3", "3")
//!     .webhook_endpoint("https://hooks.example.com/errors")
//!     .release("2.4.0")
//!     .build()?;
//! assert_eq!(reporter.reporter_count(), 2);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    composite::{CompositeConfig, CompositeReporter},
    console::ConsoleReporter,
    crashlytics::{CrashlyticsConfig, CrashlyticsReporter},
    error::ConfigError,
    reporter::Reporter,
    sentry::{SentryConfig, SentryReporter},
    webhook::{WebhookConfig, WebhookReporter},
};

/// Starts the production preset: Sentry and Crashlytics, in parallel.
pub fn production(
    sentry_dsn: impl Into<String>,
    sentry_project_id: impl Into<String>,
    crashlytics_project_id: impl Into<String>,
    crashlytics_api_key: impl Into<String>,
) -> ProductionPreset {
    ProductionPreset {
        sentry_dsn: sentry_dsn.into(),
        sentry_project_id: sentry_project_id.into(),
        crashlytics_project_id: crashlytics_project_id.into(),
        crashlytics_api_key: crashlytics_api_key.into(),
        environment: "production".to_owned(),
        release: None,
        config: CompositeConfig::default(),
    }
}

/// Starts the development preset: console output, optionally a webhook,
/// one after another.
pub fn development() -> DevelopmentPreset {
    DevelopmentPreset {
        webhook_endpoint: None,
        webhook_headers: IndexMap::new(),
        include_console: true,
    }
}

/// Starts the staging preset: Sentry and optionally a webhook, in parallel.
pub fn staging(
    sentry_dsn: impl Into<String>,
    sentry_project_id: impl Into<String>,
) -> StagingPreset {
    StagingPreset {
        sentry_dsn: sentry_dsn.into(),
        sentry_project_id: sentry_project_id.into(),
        webhook_endpoint: None,
        webhook_headers: IndexMap::new(),
        environment: "staging".to_owned(),
        release: None,
    }
}

/// Wraps caller-chosen reporters with the given policy.
pub fn custom(
    reporters: impl IntoIterator<Item = Arc<dyn Reporter>>,
    continue_on_failure: bool,
    parallel: bool,
) -> CompositeReporter {
    CompositeReporter::with_config(
        reporters,
        CompositeConfig {
            continue_on_failure,
            parallel,
        },
    )
}

/// Builder returned by [`production`].
#[derive(Clone, Debug)]
#[must_use]
pub struct ProductionPreset {
    sentry_dsn: String,
    sentry_project_id: String,
    crashlytics_project_id: String,
    crashlytics_api_key: String,
    environment: String,
    release: Option<String>,
    config: CompositeConfig,
}

impl ProductionPreset {
    /// Environment name sent with Sentry events. Defaults to `production`.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Release identifier sent with Sentry events.
    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Defaults to `true`.
    pub fn continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.config.continue_on_failure = continue_on_failure;
        self
    }

    /// Defaults to `true`.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub(crate) fn sentry_config(&self) -> SentryConfig {
        SentryConfig {
            environment: self.environment.clone(),
            release: self.release.clone(),
            ..SentryConfig::new(&self.sentry_dsn, &self.sentry_project_id)
        }
    }

    pub(crate) fn crashlytics_config(&self) -> CrashlyticsConfig {
        CrashlyticsConfig::new(&self.crashlytics_project_id, &self.crashlytics_api_key)
    }

    /// Creates the reporters.
    pub fn build(self) -> Result<CompositeReporter, ConfigError> {
        let sentry = SentryReporter::new(self.sentry_config())?;
        let crashlytics = CrashlyticsReporter::new(self.crashlytics_config())?;

        Ok(CompositeReporter::with_config(
            [
                Arc::new(sentry) as Arc<dyn Reporter>,
                Arc::new(crashlytics),
            ],
            self.config,
        ))
    }
}

/// Builder returned by [`development`].
#[derive(Clone, Debug)]
#[must_use]
pub struct DevelopmentPreset {
    webhook_endpoint: Option<String>,
    webhook_headers: IndexMap<String, String>,
    include_console: bool,
}

impl DevelopmentPreset {
    /// Also send records to this endpoint, with a single attempt each.
    pub fn webhook_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.webhook_endpoint = Some(endpoint.into());
        self
    }

    /// Headers for the webhook. Ignored without an endpoint.
    pub fn webhook_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.webhook_headers = headers;
        self
    }

    /// Whether to log records to the console. Defaults to `true`.
    pub fn include_console(mut self, include_console: bool) -> Self {
        self.include_console = include_console;
        self
    }

    pub(crate) fn webhook_config(&self) -> Option<WebhookConfig> {
        let endpoint = self.webhook_endpoint.as_ref()?;
        Some(WebhookConfig {
            headers: self.webhook_headers.clone(),
            retry_attempts: 1,
            ..WebhookConfig::new(endpoint)
        })
    }

    /// Creates the reporters. Without console and webhook the composite is
    /// empty and every report completes immediately.
    pub fn build(self) -> Result<CompositeReporter, ConfigError> {
        let mut reporters: Vec<Arc<dyn Reporter>> = Vec::with_capacity(2);
        if self.include_console {
            reporters.push(Arc::new(ConsoleReporter::new()));
        }
        if let Some(config) = self.webhook_config() {
            reporters.push(Arc::new(WebhookReporter::new(config)?));
        }

        Ok(CompositeReporter::with_config(
            reporters,
            CompositeConfig {
                continue_on_failure: true,
                parallel: false,
            },
        ))
    }
}

/// Builder returned by [`staging`].
#[derive(Clone, Debug)]
#[must_use]
pub struct StagingPreset {
    sentry_dsn: String,
    sentry_project_id: String,
    webhook_endpoint: Option<String>,
    webhook_headers: IndexMap<String, String>,
    environment: String,
    release: Option<String>,
}

impl StagingPreset {
    /// Also send records to this endpoint, with two attempts each.
    pub fn webhook_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.webhook_endpoint = Some(endpoint.into());
        self
    }

    /// Headers for the webhook. Ignored without an endpoint.
    pub fn webhook_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.webhook_headers = headers;
        self
    }

    /// Environment name sent with Sentry events. Defaults to `staging`.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Release identifier sent with Sentry events.
    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub(crate) fn sentry_config(&self) -> SentryConfig {
        SentryConfig {
            environment: self.environment.clone(),
            release: self.release.clone(),
            ..SentryConfig::new(&self.sentry_dsn, &self.sentry_project_id)
        }
    }

    pub(crate) fn webhook_config(&self) -> Option<WebhookConfig> {
        let endpoint = self.webhook_endpoint.as_ref()?;
        Some(WebhookConfig {
            headers: self.webhook_headers.clone(),
            retry_attempts: 2,
            ..WebhookConfig::new(endpoint)
        })
    }

    /// Creates the reporters.
    pub fn build(self) -> Result<CompositeReporter, ConfigError> {
        let mut reporters: Vec<Arc<dyn Reporter>> = Vec::with_capacity(2);
        reporters.push(Arc::new(SentryReporter::new(self.sentry_config())?));
        if let Some(config) = self.webhook_config() {
            reporters.push(Arc::new(WebhookReporter::new(config)?));
        }

        Ok(CompositeReporter::new(reporters))
    }
}
