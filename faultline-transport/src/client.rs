use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use rootcause::Report;

use crate::{
    method::{HttpMethod, UnsupportedMethod},
    transport::AttemptError,
};

/// One outbound request to a reporting endpoint.
///
/// Requests are plain data. They can be sent any number of times, which is
/// what lets [`Transport`](crate::Transport) retry them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    url: String,
    headers: IndexMap<String, String>,
    body: Option<String>,
}

impl HttpRequest {
    /// Creates a request, validating the method name.
    ///
    /// Unsupported methods are a configuration error and are returned
    /// immediately; they are never retried.
    ///
    /// ```
    /// use faultline_transport::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::new("put", "https://example.com/errors").unwrap();
    /// assert_eq!(request.method(), HttpMethod::Put);
    /// assert!(HttpRequest::new("DELETE", "https://example.com/errors").is_err());
    /// ```
    pub fn new(method: &str, url: impl Into<String>) -> Result<Self, UnsupportedMethod> {
        Ok(Self::with_method(method.parse()?, url))
    }

    /// Creates a request from an already validated method.
    pub fn with_method(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    /// Adds a header, replacing an earlier header with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds several headers in order, later ones replacing earlier ones.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the request body. Ignored for `GET` requests.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        if self.method.has_body() {
            self.body = Some(body.into());
        }
        self
    }

    /// The request method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The full request URL, including any query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The request headers, in insertion order.
    pub fn header_map(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Looks up a header value by name, ignoring ASCII case.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The request body, if any.
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// The part of a response the delivery logic cares about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
}

impl HttpResponse {
    /// Whether the status is in `[200, 300)`.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Performs a single HTTP exchange.
///
/// Implementations must not retry; retries belong to
/// [`Transport`](crate::Transport). Any failure to obtain a response is
/// returned as an `Err`, a non-2xx response is returned as `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Sends `request` once.
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Report>;

    /// Releases the underlying connection pool. Must be idempotent.
    fn close(&self) {}
}

/// [`HttpClient`] backed by a [`reqwest::Client`].
///
/// Closing the client drops the connection pool. Requests issued after
/// [`HttpClient::close`] fail with [`AttemptError::ClientClosed`].
#[derive(Debug)]
pub struct ReqwestClient {
    inner: RwLock<Option<reqwest::Client>>,
}

impl ReqwestClient {
    /// Creates a client with the default reqwest configuration.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("faultline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::from_client(client))
    }

    /// Wraps an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            inner: RwLock::new(Some(client)),
        }
    }

    /// Whether [`HttpClient::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Report> {
        // reqwest clients are reference counted, so the lock is not held
        // across the await below.
        let client = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(client) = client else {
            return Err(AttemptError::ClientClosed.into());
        };

        let mut builder = client.request(request.method().into(), request.url());
        for (name, value) in request.header_map() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body_text() {
            builder = builder.body(body.to_owned());
        }

        match builder.send().await {
            Ok(response) => Ok(HttpResponse {
                status: response.status().as_u16(),
            }),
            Err(e) => Err(AttemptError::Request(e).into()),
        }
    }

    fn close(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
