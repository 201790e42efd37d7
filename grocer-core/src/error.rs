//! Core error types for Grocer.
//!
//! [`CoreError`] is the closed set of failure kinds that cross crate
//! boundaries. It is `Clone` so that every caller joined on a single token
//! refresh can receive the same failure.

use thiserror::Error;

/// Core error type for Grocer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No usable credential; the interactive authorization flow must run.
    #[error("Authorization required: {0}")]
    AuthorizationRequired(String),

    /// The refresh token was rejected by the provider.
    #[error("Reauthorization required: refresh token was rejected")]
    ReauthorizationRequired,

    /// The bearer token was rejected by a gateway call.
    #[error("Unauthorized: bearer token rejected")]
    Unauthorized,

    /// Network failure, timeout, rate limit, or 5xx from the remote service.
    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote service rejected the request (4xx other than 401).
    #[error("Remote service rejected request ({status}): {message}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Response body or description.
        message: String,
    },

    /// No confident product choice could be made.
    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    /// No usable candidates.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The batch was cancelled before this work started.
    #[error("Cancelled")]
    Cancelled,

    /// Invalid data from the remote service or the user.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credential storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Short, stable name of the error kind, used as outcome detail.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::AuthorizationRequired(_) => "AuthorizationRequired",
            Self::ReauthorizationRequired => "ReauthorizationRequired",
            Self::Unauthorized => "Unauthorized",
            Self::RemoteUnavailable(_) => "RemoteUnavailable",
            Self::RemoteRejected { .. } => "RemoteRejected",
            Self::AmbiguousMatch(_) => "AmbiguousMatch",
            Self::NotFound(_) => "NotFound",
            Self::Cancelled => "Cancelled",
            Self::InvalidData(_) => "InvalidData",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Storage(_) => "Storage",
        }
    }

    /// Returns true if no further authenticated call can succeed without
    /// user interaction.
    pub fn requires_authorization(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationRequired(_) | Self::ReauthorizationRequired
        )
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(
            CoreError::ReauthorizationRequired.kind_name(),
            "ReauthorizationRequired"
        );
        assert_eq!(
            CoreError::RemoteRejected {
                status: 404,
                message: String::new()
            }
            .kind_name(),
            "RemoteRejected"
        );
    }

    #[test]
    fn test_requires_authorization() {
        assert!(CoreError::ReauthorizationRequired.requires_authorization());
        assert!(CoreError::AuthorizationRequired("x".into()).requires_authorization());
        assert!(!CoreError::Unauthorized.requires_authorization());
        assert!(!CoreError::RemoteUnavailable("x".into()).requires_authorization());
    }

    #[test]
    fn test_retryable() {
        assert!(CoreError::RemoteUnavailable("timeout".into()).is_retryable());
        assert!(!CoreError::NotFound("milk".into()).is_retryable());
    }
}
