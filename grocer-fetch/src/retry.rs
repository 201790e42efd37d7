//! Retry strategies for HTTP requests.

use std::time::Duration;

/// Strategy for retrying failed requests.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Whether to use exponential backoff.
    pub exponential_backoff: bool,
    /// Maximum delay between retries, also caps `Retry-After`.
    pub max_delay: Duration,
    /// Retry only failures where the request never reached the server.
    pub connect_only: bool,
}

impl RetryStrategy {
    /// Creates a new retry strategy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(500),
            exponential_backoff: true,
            max_delay: Duration::from_secs(30),
            connect_only: false,
        }
    }

    /// Retries only connection failures.
    ///
    /// For requests that must not reach the server twice, such as
    /// single-use grant submissions. Timeouts and error statuses are
    /// returned on the first attempt.
    pub fn connect_errors_only(max_attempts: u32) -> Self {
        Self {
            connect_only: true,
            ..Self::new(max_attempts)
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            exponential_backoff: false,
            max_delay: Duration::ZERO,
            connect_only: false,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables exponential backoff.
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Calculates the delay after a given attempt number (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            self.base_delay
                .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        } else {
            self.base_delay
        };

        delay.min(self.max_delay)
    }

    /// Delay honouring a server `Retry-After`, capped at `max_delay`.
    pub fn delay_with_retry_after(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        match retry_after {
            Some(secs) => Duration::from_secs(secs).min(self.max_delay),
            None => self.delay_for_attempt(attempt),
        }
    }

    /// Determines if a request error should be retried.
    pub fn should_retry(&self, error: &reqwest::Error) -> bool {
        error.is_connect() || (!self.connect_only && error.is_timeout())
    }

    /// Determines if a response status should be retried.
    pub fn should_retry_status(&self, status: reqwest::StatusCode) -> bool {
        !self.connect_only
            && (status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(3)
    }
}
