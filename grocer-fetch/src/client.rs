//! HTTP client with retries.
//!
//! Connection failures, timeouts, 429 and 5xx responses are retried with
//! exponential backoff (honouring `Retry-After`). Any other non-success
//! status is returned immediately as [`HttpError::Status`] so callers can
//! map it (401 to `Unauthorized`, other 4xx to `RemoteRejected`).

use reqwest::{Client, RequestBuilder, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::HttpError;
use crate::retry::RetryStrategy;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest response body kept in an error.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// User agent string for Grocer.
const USER_AGENT: &str = concat!("grocer/", env!("CARGO_PKG_VERSION"));

/// HTTP client with retry capabilities.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    retry_strategy: RetryStrategy,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: client,
            retry_strategy: RetryStrategy::default(),
        })
    }

    /// Sets the retry strategy for this client.
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Returns the retry strategy.
    pub fn retry_strategy(&self) -> &RetryStrategy {
        &self.retry_strategy
    }

    /// Sends a request built by `build`, retrying transient failures.
    ///
    /// `build` is called once per attempt.
    pub async fn execute<F>(&self, build: F) -> Result<Response, HttpError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let max_attempts = self.retry_strategy.max_attempts;
        let mut attempts = 0;

        loop {
            attempts += 1;

            match build(&self.inner).send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(status = %status, attempt = attempts, "Response received");
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok());

                    if attempts < max_attempts && self.retry_strategy.should_retry_status(status) {
                        let delay = self
                            .retry_strategy
                            .delay_with_retry_after(attempts, retry_after);
                        warn!(
                            status = %status,
                            delay_ms = delay.as_millis(),
                            "Transient HTTP status, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(HttpError::Status {
                        status: status.as_u16(),
                        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                        retry_after,
                    });
                }
                Err(e) => {
                    if attempts < max_attempts && self.retry_strategy.should_retry(&e) {
                        let delay = self.retry_strategy.delay_for_attempt(attempts);
                        warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// GET with a bearer token, decoding a JSON response.
    #[instrument(skip(self, query, token), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T, HttpError> {
        let response = self
            .execute(|client| client.get(url).query(query).bearer_auth(token))
            .await?;
        Ok(response.json().await?)
    }

    /// PUT a JSON body with a bearer token.
    #[instrument(skip(self, body, token), fields(url = %url))]
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        token: &str,
    ) -> Result<Response, HttpError> {
        self.execute(|client| client.put(url).json(body).bearer_auth(token))
            .await
    }

    /// POST a form with HTTP Basic authentication.
    #[instrument(skip(self, form, username, password), fields(url = %url))]
    pub async fn post_form_basic<B: Serialize + ?Sized>(
        &self,
        url: &str,
        form: &B,
        username: &str,
        password: &str,
    ) -> Result<Response, HttpError> {
        self.execute(|client| {
            client
                .post(url)
                .basic_auth(username, Some(password))
                .form(form)
        })
        .await
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}
