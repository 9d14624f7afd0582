//! Reporter for the Crashlytics-style `reports:create` API.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use faultline_transport::{
    Delivery, HttpClient, HttpMethod, HttpRequest, ReqwestClient, RetryPolicy, Transport,
};
use rootcause::Report;
use serde::Serialize;

use crate::{
    error::ConfigError,
    payload::{PACKAGE, format_timestamp, platform},
    record::{Category, ErrorRecord, Fields, Severity},
    reporter::Reporter,
    user::{UserIdentity, UserSlot},
};

/// Configuration of a [`CrashlyticsReporter`].
#[derive(Clone, PartialEq, Eq)]
pub struct CrashlyticsConfig {
    /// Project the reports belong to.
    pub project_id: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Service host, without scheme.
    pub host: String,
    /// Timeout of the single delivery attempt.
    pub timeout: Duration,
}

impl CrashlyticsConfig {
    /// Host used unless overridden.
    pub const DEFAULT_HOST: &'static str = "firebasecrashlytics.googleapis.com";

    /// Default configuration for the given project and key.
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            host: Self::DEFAULT_HOST.to_owned(),
            timeout: RetryPolicy::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// The endpoint reports are posted to.
    pub fn endpoint(&self) -> String {
        let host = &self.host;
        let project_id = &self.project_id;
        format!("https://{host}/v1/projects/{project_id}/reports:create")
    }
}

impl fmt::Debug for CrashlyticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashlyticsConfig")
            .field("project_id", &self.project_id)
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Sends records as crash reports, one attempt each.
pub struct CrashlyticsReporter {
    config: CrashlyticsConfig,
    endpoint: String,
    transport: Transport,
    user: UserSlot,
}

impl CrashlyticsReporter {
    /// Creates a reporter with its own HTTP client.
    pub fn new(config: CrashlyticsConfig) -> Result<Self, ConfigError> {
        let client = ReqwestClient::new().map_err(ConfigError::Client)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Creates a reporter sending through `client`.
    pub fn with_client(config: CrashlyticsConfig, client: Arc<dyn HttpClient>) -> Self {
        let endpoint = config.endpoint();
        let transport = Transport::new(client, RetryPolicy::single_attempt(config.timeout));
        Self {
            config,
            endpoint,
            transport,
            user: UserSlot::default(),
        }
    }

    /// The configuration this reporter was built with.
    pub fn config(&self) -> &CrashlyticsConfig {
        &self.config
    }

    /// The identity this reporter attributes records to.
    pub fn user(&self) -> UserIdentity {
        self.user.snapshot()
    }

    /// Sends `record` and returns how delivery went.
    pub async fn send_record(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<Delivery, Report> {
        let request = self.build_request(record, extra)?;
        Ok(self.transport.send(&request).await)
    }

    /// Builds the report request for `record` without sending it.
    pub fn build_request(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<HttpRequest, Report> {
        let user = self.user.snapshot();
        let body = serde_json::to_string(&Envelope {
            report: ReportData {
                data: CrashData {
                    crash_report: CrashReport::new(record, extra, &user),
                },
            },
        })?;

        Ok(HttpRequest::with_method(HttpMethod::Post, self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .body(body))
    }
}

impl fmt::Debug for CrashlyticsReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashlyticsReporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

const fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "INFO",
        Severity::Medium => "WARNING",
        Severity::High => "ERROR",
        Severity::Critical => "FATAL",
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    report: ReportData<'a>,
}

#[derive(Serialize)]
struct ReportData<'a> {
    data: CrashData<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrashData<'a> {
    crash_report: CrashReport<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrashReport<'a> {
    level: &'static str,
    exception: Exception<'a>,
    error_type: Category,
    error_source: Option<&'a str>,
    context: &'a Fields,
    error_context: Option<&'a Fields>,
    user_data: Option<&'a Fields>,
    metadata: CrashMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_properties: Option<Fields>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Exception<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    message: String,
    stack_trace: &'a str,
}

#[derive(Serialize)]
struct CrashMetadata {
    platform: &'static str,
    package: &'static str,
    timestamp: String,
}

impl<'a> CrashReport<'a> {
    fn new(record: &'a ErrorRecord, extra: &'a Fields, user: &UserIdentity) -> Self {
        Self {
            level: level(record.severity()),
            exception: Exception {
                kind: record.error_type(),
                message: record.message(),
                stack_trace: record.trace(),
            },
            error_type: record.category(),
            error_source: record.source(),
            context: extra,
            error_context: record.context(),
            user_data: record.user_data(),
            metadata: CrashMetadata {
                platform: platform(),
                package: PACKAGE,
                timestamp: format_timestamp(record.occurred_at().unwrap_or_else(Utc::now)),
            },
            user_id: user.id.clone(),
            user_properties: Some(user.properties.clone()).filter(|p| !p.is_empty()),
        }
    }
}

#[async_trait]
impl Reporter for CrashlyticsReporter {
    fn name(&self) -> &str {
        "crashlytics"
    }

    async fn report_with_context(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<(), Report> {
        self.send_record(record, extra).await.map(|_| ())
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

    fn dispose(&self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_host_and_project() {
        let config = CrashlyticsConfig::new("my-app", "key");
        assert_eq!(
            config.endpoint(),
            "https://firebasecrashlytics.googleapis.com/v1/projects/my-app/reports:create"
        );

        let config = CrashlyticsConfig {
            host: "localhost:8089".to_owned(),
            ..config
        };
        assert_eq!(
            config.endpoint(),
            "https://localhost:8089/v1/projects/my-app/reports:create"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = CrashlyticsConfig::new("my-app", "very-secret");
        assert!(!format!("{config:?}").contains("very-secret"));
    }

    #[test]
    fn test_levels() {
        assert_eq!(level(Severity::Low), "INFO");
        assert_eq!(level(Severity::Medium), "WARNING");
        assert_eq!(level(Severity::High), "ERROR");
        assert_eq!(level(Severity::Critical), "FATAL");
    }
}
