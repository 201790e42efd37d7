//! Fetch error types.

use grocer_core::CoreError;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request could not be sent or the response could not be read.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Non-success status after retries were exhausted.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
        /// Retry-After header in seconds, if present.
        retry_after: Option<u64>,
    },
}

impl HttpError {
    /// Status code, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl(_) => None,
        }
    }

    /// Response body, if the server answered.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<HttpError> for CoreError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status: 401, .. } => CoreError::Unauthorized,
            HttpError::Status { status, body, .. } if status == 429 || status >= 500 => {
                CoreError::RemoteUnavailable(format!("HTTP {status}: {body}"))
            }
            HttpError::Status { status, body, .. } => CoreError::RemoteRejected {
                status,
                message: body,
            },
            HttpError::Request(e) if e.is_decode() => CoreError::InvalidData(e.to_string()),
            HttpError::Request(e) => CoreError::RemoteUnavailable(e.to_string()),
            HttpError::InvalidUrl(url) => CoreError::InvalidConfig(format!("invalid URL: {url}")),
        }
    }
}

// ============================================================================
// Callback Error
// ============================================================================

/// Error type for the local redirect listener and manual code entry.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The listener port could not be bound.
    #[error("Could not bind callback port {port}: {source}")]
    Bind {
        /// Port requested.
        port: u16,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// No callback arrived in time.
    #[error("No authorization callback received within {0:?}")]
    Timeout(Duration),

    /// The redirect could not be parsed.
    #[error("Malformed redirect: {0}")]
    Malformed(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Authorization Flow Error
// ============================================================================

/// Error type for the interactive Authorization-Code flow.
#[derive(Debug, Error)]
pub enum AuthFlowError {
    /// The callback's state does not match the pending session.
    #[error("State mismatch: the callback does not belong to the pending authorization")]
    StateMismatch,

    /// The session was already completed.
    #[error("Authorization session already used")]
    SessionConsumed,

    /// The session outlived its time-to-live.
    #[error("Authorization session expired; start a new login")]
    SessionExpired,

    /// No authorization flow was started.
    #[error("No pending authorization session")]
    NoPendingSession,

    /// The callback carried no code.
    #[error("Callback did not include an authorization code")]
    MissingCode,

    /// The user or provider denied access.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Listener or manual entry failed.
    #[error("Callback error: {0}")]
    Callback(#[from] CallbackError),

    /// Code exchange or credential persistence failed.
    #[error("Token exchange failed: {0}")]
    Exchange(#[from] CoreError),
}

impl AuthFlowError {
    /// Stable kind name.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::StateMismatch => "StateMismatch",
            Self::SessionConsumed => "SessionConsumed",
            Self::SessionExpired => "SessionExpired",
            Self::NoPendingSession => "NoPendingSession",
            Self::MissingCode => "MissingCode",
            Self::AccessDenied(_) => "AccessDenied",
            Self::Callback(_) => "Callback",
            Self::Exchange(_) => "Exchange",
        }
    }
}
