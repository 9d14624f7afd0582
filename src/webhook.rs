//! Reporter posting records to a generic HTTP endpoint.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use faultline_transport::{
    Delivery, HttpClient, HttpMethod, HttpRequest, ReqwestClient, RetryPolicy, Transport,
};
use indexmap::IndexMap;
use reqwest::Url;
use rootcause::Report;
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::ConfigError,
    payload::{Metadata, format_timestamp},
    record::{Category, ErrorRecord, Fields, Severity},
    reporter::Reporter,
    user::{UserIdentity, UserSlot},
};

/// Configuration of a [`WebhookReporter`].
///
/// Start from [`WebhookConfig::new`] and override fields with struct update
/// syntax:
///
/// ```
/// use faultline::WebhookConfig;
///
/// let config = WebhookConfig {
///     retry_attempts: 1,
///     ..WebhookConfig::new("http://localhost:3000/errors")
/// };
/// assert_eq!(config.method, "POST");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    /// The URL records are sent to.
    pub endpoint: String,
    /// HTTP method: GET, POST, PUT or PATCH. Validated when a record is
    /// sent, not at construction.
    pub method: String,
    /// Extra headers, applied over `Content-Type: application/json`.
    pub headers: IndexMap<String, String>,
    /// Timeout of a single attempt.
    pub timeout: Duration,
    /// Total number of attempts per record.
    pub retry_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl WebhookConfig {
    /// Default configuration for `endpoint`: POST, 10 second timeout, three
    /// attempts one second apart.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: "POST".to_owned(),
            headers: IndexMap::new(),
            timeout: RetryPolicy::DEFAULT_REQUEST_TIMEOUT,
            retry_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            retry_delay: RetryPolicy::DEFAULT_RETRY_DELAY,
        }
    }

    /// The retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_delay, self.timeout)
    }
}

/// Sends records as JSON (or as a query string for GET) to any HTTP
/// endpoint, retrying failed deliveries.
pub struct WebhookReporter {
    config: WebhookConfig,
    endpoint: Url,
    transport: Transport,
    user: UserSlot,
}

impl WebhookReporter {
    /// Creates a reporter with its own HTTP client.
    pub fn new(config: WebhookConfig) -> Result<Self, ConfigError> {
        let client = ReqwestClient::new().map_err(ConfigError::Client)?;
        Self::with_client(config, Arc::new(client))
    }

    /// Creates a reporter sending through `client`.
    pub fn with_client(
        config: WebhookConfig,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        let transport = Transport::new(client, config.retry_policy());
        Ok(Self {
            config,
            endpoint,
            transport,
            user: UserSlot::default(),
        })
    }

    /// The configuration this reporter was built with.
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// The identity this reporter attributes records to.
    pub fn user(&self) -> UserIdentity {
        self.user.snapshot()
    }

    /// Sends `record` and returns how delivery went.
    ///
    /// Only a configuration error, such as an unsupported method, is
    /// returned as `Err`. Delivery failures are logged and reported as
    /// [`Delivery::Failed`].
    pub async fn send_record(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<Delivery, Report> {
        let request = self.build_request(record, extra)?;
        Ok(self.transport.send(&request).await)
    }

    /// Builds the request for `record` without sending it.
    pub fn build_request(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<HttpRequest, Report> {
        let method: HttpMethod = self.config.method.parse()?;
        let user = self.user.snapshot();

        let headers = [("Content-Type".to_owned(), "application/json".to_owned())]
            .into_iter()
            .chain(self.config.headers.clone());

        if method.has_body() {
            let body = serde_json::to_string(&WebhookPayload::new(record, extra, &user))?;
            Ok(HttpRequest::with_method(method, self.endpoint.as_str())
                .headers(headers)
                .body(body))
        } else {
            let mut url = self.endpoint.clone();
            url.query_pairs_mut()
                .extend_pairs(query_pairs(record, extra, &user));
            let request = HttpRequest::with_method(method, url.as_str());
            Ok(request.headers(headers))
        }
    }
}

impl core::fmt::Debug for WebhookReporter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebhookReporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    error: ErrorSection<'a>,
    context: &'a Fields,
    error_context: Option<&'a Fields>,
    user_data: Option<&'a Fields>,
    metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserSection<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorSection<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    message: String,
    stack_trace: &'a str,
    severity: Severity,
    error_type: Category,
    error_source: Option<&'a str>,
    timestamp: Option<String>,
}

#[derive(Serialize)]
struct UserSection<'a> {
    id: &'a str,
    properties: &'a Fields,
}

impl<'a> WebhookPayload<'a> {
    fn new(record: &'a ErrorRecord, extra: &'a Fields, user: &'a UserIdentity) -> Self {
        Self {
            error: ErrorSection {
                kind: record.error_type(),
                message: record.message(),
                stack_trace: record.trace(),
                severity: record.severity(),
                error_type: record.category(),
                error_source: record.source(),
                timestamp: record.occurred_at().map(format_timestamp),
            },
            context: extra,
            error_context: record.context(),
            user_data: record.user_data(),
            metadata: Metadata::current(),
            user: user.id.as_deref().map(|id| UserSection {
                id,
                properties: &user.properties,
            }),
        }
    }
}

/// The flattened parameters of a GET report.
///
/// Context entries from the record come first, then the extra context; an
/// extra entry replaces a record entry with the same key. Only strings,
/// numbers and booleans are encoded.
fn query_pairs(record: &ErrorRecord, extra: &Fields, user: &UserIdentity) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("error_type".to_owned(), record.error_type().to_owned()),
        ("error_message".to_owned(), record.message()),
        ("severity".to_owned(), record.severity().to_string()),
        ("error_type_category".to_owned(), record.category().to_string()),
    ];
    if let Some(at) = record.occurred_at() {
        pairs.push(("timestamp".to_owned(), format_timestamp(at)));
    }
    if let Some(id) = &user.id {
        pairs.push(("user_id".to_owned(), id.clone()));
    }

    let mut context: IndexMap<&str, String> = IndexMap::new();
    let entries = record.context().into_iter().flatten().chain(extra);
    for (key, value) in entries {
        if let Some(value) = primitive(value) {
            context.insert(key.as_str(), value);
        }
    }
    for (key, value) in context {
        pairs.push((format!("ctx_{key}"), value));
    }
    pairs
}

fn primitive(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[async_trait]
impl Reporter for WebhookReporter {
    fn name(&self) -> &str {
        "webhook"
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
