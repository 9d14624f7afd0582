use std::{sync::Arc, time::Duration};

use rootcause::{Report, report_collection::ReportCollection};

use crate::{
    client::{HttpClient, HttpRequest},
    policy::RetryPolicy,
};

/// Why a single delivery attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// The endpoint answered with a status outside of `[200, 300)`.
    #[error("endpoint responded with status {0}")]
    Status(u16),
    /// No response arrived within the request timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// The client was closed before the request was issued.
    #[error("HTTP client has been closed")]
    ClientClosed,
    /// The request could not be completed.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}

/// Context of the report produced when every attempt has failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("delivery to {url} failed after {attempts} attempt(s)")]
pub struct DeliveryFailed {
    /// The request URL.
    pub url: String,
    /// How many attempts were made.
    pub attempts: u32,
}

/// The outcome of [`Transport::send`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The endpoint accepted the request.
    Delivered {
        /// Attempts used, including the successful one.
        attempts: u32,
        /// Status of the successful response.
        status: u16,
    },
    /// Every attempt failed. The failures have already been logged.
    Failed {
        /// Attempts made.
        attempts: u32,
    },
}

impl Delivery {
    /// Whether the endpoint accepted the request.
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }

    /// Number of attempts made.
    pub const fn attempts(&self) -> u32 {
        match *self {
            Delivery::Delivered { attempts, .. } | Delivery::Failed { attempts } => attempts,
        }
    }
}

/// Sends requests with bounded retries.
///
/// Each transport owns its client. Transports are cheap to clone; clones
/// share the client.
#[derive(Clone)]
pub struct Transport {
    client: Arc<dyn HttpClient>,
    policy: RetryPolicy,
}

impl core::fmt::Debug for Transport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transport")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Creates a transport sending through `client` with `policy`.
    pub fn new(client: Arc<dyn HttpClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// The retry policy, fixed at construction.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Closes the underlying client. Calling this more than once is a no-op.
    pub fn close(&self) {
        self.client.close();
    }

    /// Sends `request`, retrying according to the policy.
    ///
    /// This never fails. When all attempts fail, the attempt history is
    /// logged at `warn` level and [`Delivery::Failed`] is returned.
    pub async fn send(&self, request: &HttpRequest) -> Delivery {
        match self.try_send(request).await {
            Ok(delivery) => delivery,
            Err(report) => {
                let attempts = report.current_context().attempts;
                tracing::warn!(
                    url = %request.url(),
                    attempts,
                    "error report could not be delivered\n{report}"
                );
                Delivery::Failed { attempts }
            }
        }
    }

    /// Like [`Transport::send`], but returns the attempt history instead of
    /// logging it.
    ///
    /// The returned report has one child per failed attempt, each tagged
    /// with its attempt number.
    pub async fn try_send(
        &self,
        request: &HttpRequest,
    ) -> Result<Delivery, Report<DeliveryFailed>> {
        let max_attempts = self.policy.max_attempts();
        let timeout = self.policy.request_timeout();
        let mut failures: ReportCollection = ReportCollection::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.policy.retry_delay();
                tracing::warn!(
                    url = %request.url(),
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retrying error report delivery"
                );
                tokio::time::sleep(delay).await;
            }

            let outcome = tokio::time::timeout(timeout, self.client.execute(request)).await;
            let failure: Report = match outcome {
                Ok(Ok(response)) if response.is_success() => {
                    return Ok(Delivery::Delivered {
                        attempts: attempt,
                        status: response.status,
                    });
                }
                Ok(Ok(response)) => Report::from(AttemptError::Status(response.status)),
                Ok(Err(report)) => report,
                Err(_elapsed) => Report::from(AttemptError::Timeout(timeout)),
            };

            tracing::debug!(
                url = %request.url(),
                attempt,
                "error report delivery attempt failed: {failure}"
            );
            let failure = failure.attach(format!("Attempt #{attempt}"));
            failures.push(failure.into_cloneable());
        }

        Err(failures.context(DeliveryFailed {
            url: request.url().to_owned(),
            attempts: max_attempts,
        }))
    }
}
