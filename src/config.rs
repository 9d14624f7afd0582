//! Choosing a preset from environment variables.

use core::{fmt, str::FromStr};

use crate::{composite::CompositeReporter, error::ConfigError, presets};

/// The deployment environments a preset exists for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Sentry and Crashlytics.
    Production,
    /// Sentry and an optional webhook.
    Staging,
    /// Console and an optional webhook.
    #[default]
    Development,
}

impl Environment {
    /// The lowercase name, as accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [
            Environment::Production,
            Environment::Staging,
            Environment::Development,
        ]
        .into_iter()
        .find(|env| env.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| ConfigError::UnknownEnvironment(s.to_owned()))
    }
}

/// A preset and its settings, read from the environment.
///
/// # Environment Variables
///
/// - `FAULTLINE_ENVIRONMENT` - `production`, `staging` or `development`
///   (default)
/// - `FAULTLINE_SENTRY_DSN`, `FAULTLINE_SENTRY_PROJECT` - required for
///   production and staging
/// - `FAULTLINE_CRASHLYTICS_PROJECT`, `FAULTLINE_CRASHLYTICS_API_KEY` -
///   required for production
/// - `FAULTLINE_WEBHOOK_URL` - optional webhook for staging and development
/// - `FAULTLINE_RELEASE` - optional release sent with Sentry events
///
/// Empty values count as unset.
///
/// # Examples
///
/// ```
/// use faultline::config::{Environment, PresetSelection};
///
/// let selection = PresetSelection::from_lookup(|name| match name {
///     "FAULTLINE_ENVIRONMENT" => Some("staging".to_owned()),
///     "FAULTLINE_SENTRY_DSN" => Some("https://key@sentry.io/4".to_owned()),
///     "FAULTLINE_SENTRY_PROJECT" => Some("4".to_owned()),
///     _ => None,
/// })
/// .unwrap();
/// assert_eq!(selection.environment, Environment::Staging);
/// assert_eq!(selection.webhook_url, None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresetSelection {
    /// Which preset to build.
    pub environment: Environment,
    /// Sentry DSN.
    pub sentry_dsn: Option<String>,
    /// Sentry project id.
    pub sentry_project_id: Option<String>,
    /// Crashlytics project id.
    pub crashlytics_project_id: Option<String>,
    /// Crashlytics API key.
    pub crashlytics_api_key: Option<String>,
    /// Webhook endpoint.
    pub webhook_url: Option<String>,
    /// Release identifier.
    pub release: Option<String>,
}

const ENVIRONMENT: &str = "FAULTLINE_ENVIRONMENT";
const SENTRY_DSN: &str = "FAULTLINE_SENTRY_DSN";
const SENTRY_PROJECT: &str = "FAULTLINE_SENTRY_PROJECT";
const CRASHLYTICS_PROJECT: &str = "FAULTLINE_CRASHLYTICS_PROJECT";
const CRASHLYTICS_API_KEY: &str = "FAULTLINE_CRASHLYTICS_API_KEY";
const WEBHOOK_URL: &str = "FAULTLINE_WEBHOOK_URL";
const RELEASE: &str = "FAULTLINE_RELEASE";

impl PresetSelection {
    /// Reads the selection from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the selection through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let environment = match get(ENVIRONMENT) {
            Some(name) => name.parse()?,
            None => Environment::default(),
        };

        Ok(Self {
            environment,
            sentry_dsn: get(SENTRY_DSN),
            sentry_project_id: get(SENTRY_PROJECT),
            crashlytics_project_id: get(CRASHLYTICS_PROJECT),
            crashlytics_api_key: get(CRASHLYTICS_API_KEY),
            webhook_url: get(WEBHOOK_URL),
            release: get(RELEASE),
        })
    }

    /// Builds the selected preset.
    pub fn build(self) -> Result<CompositeReporter, ConfigError> {
        match self.environment {
            Environment::Production => {
                let mut preset = presets::production(
                    required(self.sentry_dsn, SENTRY_DSN)?,
                    required(self.sentry_project_id, SENTRY_PROJECT)?,
                    required(self.crashlytics_project_id, CRASHLYTICS_PROJECT)?,
                    required(self.crashlytics_api_key, CRASHLYTICS_API_KEY)?,
                );
                if let Some(release) = self.release {
                    preset = preset.release(release);
                }
                preset.build()
            }
            Environment::Staging => {
                let mut preset = presets::staging(
                    required(self.sentry_dsn, SENTRY_DSN)?,
                    required(self.sentry_project_id, SENTRY_PROJECT)?,
                );
                if let Some(release) = self.release {
                    preset = preset.release(release);
                }
                if let Some(url) = self.webhook_url {
                    preset = preset.webhook_endpoint(url);
                }
                preset.build()
            }
            Environment::Development => {
                let mut preset = presets::development();
                if let Some(url) = self.webhook_url {
                    preset = preset.webhook_endpoint(url);
                }
                preset.build()
            }
        }
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::MissingVariable(name))
}
