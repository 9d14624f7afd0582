use std::time::Duration;

/// How a [`Transport`](crate::Transport) retries a request.
///
/// The delay between attempts is fixed; it does not grow with the attempt
/// number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    request_timeout: Duration,
}

impl RetryPolicy {
    /// Attempts made by [`RetryPolicy::default`].
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Delay used by [`RetryPolicy::default`].
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
    /// Timeout used by [`RetryPolicy::default`].
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a policy. `max_attempts` is clamped to at least one and a
    /// zero `request_timeout` is replaced by the default timeout.
    pub const fn new(max_attempts: u32, retry_delay: Duration, request_timeout: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            retry_delay,
            request_timeout: if request_timeout.is_zero() {
                Self::DEFAULT_REQUEST_TIMEOUT
            } else {
                request_timeout
            },
        }
    }

    /// A policy making exactly one attempt with the given timeout.
    pub const fn single_attempt(request_timeout: Duration) -> Self {
        Self::new(1, Duration::ZERO, request_timeout)
    }

    /// Total number of attempts, including the first one.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fixed wait between two attempts.
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Upper bound for a single attempt.
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_ATTEMPTS,
            Self::DEFAULT_RETRY_DELAY,
            Self::DEFAULT_REQUEST_TIMEOUT,
        )
    }
}
