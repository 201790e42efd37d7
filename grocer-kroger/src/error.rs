//! Kroger-specific errors.

use grocer_core::CoreError;
use grocer_fetch::HttpError;
use thiserror::Error;

/// Kroger-specific errors.
#[derive(Debug, Error)]
pub enum KrogerError {
    /// Transport failure or non-success status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The OAuth endpoint returned a structured error.
    #[error("OAuth error {error} (HTTP {status}): {description}")]
    OAuth {
        /// HTTP status code.
        status: u16,
        /// OAuth error code, e.g. `invalid_grant`.
        error: String,
        /// Human-readable description, possibly empty.
        description: String,
    },

    /// Client id or secret is missing.
    #[error("Kroger client credentials are not configured")]
    MissingClientCredentials,

    /// The configured API base URL is not usable.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl KrogerError {
    /// Returns true for an OAuth error with the given code.
    pub fn is_oauth(&self, code: &str) -> bool {
        matches!(self, Self::OAuth { error, .. } if error == code)
    }
}

impl From<serde_json::Error> for KrogerError {
    fn from(err: serde_json::Error) -> Self {
        KrogerError::InvalidResponse(format!("Invalid JSON: {err}"))
    }
}

impl From<KrogerError> for CoreError {
    fn from(err: KrogerError) -> Self {
        match err {
            KrogerError::Http(e) => e.into(),
            KrogerError::InvalidResponse(message) => CoreError::InvalidData(message),
            KrogerError::OAuth { error, .. } if error == "invalid_client" => {
                CoreError::InvalidConfig("Kroger rejected the client id or secret".to_string())
            }
            KrogerError::OAuth {
                status,
                error,
                description,
            } => CoreError::RemoteRejected {
                status,
                message: if description.is_empty() {
                    error
                } else {
                    format!("{error}: {description}")
                },
            },
            KrogerError::MissingClientCredentials => CoreError::InvalidConfig(
                "set KROGER_CLIENT_ID and KROGER_CLIENT_SECRET".to_string(),
            ),
            KrogerError::InvalidBaseUrl(url) => {
                CoreError::InvalidConfig(format!("invalid API base URL: {url}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_mapping() {
        let err = KrogerError::OAuth {
            status: 400,
            error: "invalid_request".to_string(),
            description: "missing code".to_string(),
        };
        assert!(err.is_oauth("invalid_request"));
        assert_eq!(
            CoreError::from(err),
            CoreError::RemoteRejected {
                status: 400,
                message: "invalid_request: missing code".to_string()
            }
        );

        let err = KrogerError::OAuth {
            status: 401,
            error: "invalid_client".to_string(),
            description: String::new(),
        };
        assert!(matches!(CoreError::from(err), CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_http_status_passes_through() {
        let err = KrogerError::from(HttpError::Status {
            status: 401,
            body: String::new(),
            retry_after: None,
        });
        assert_eq!(CoreError::from(err), CoreError::Unauthorized);
    }

    #[test]
    fn test_bad_json() {
        let err: KrogerError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(CoreError::from(err), CoreError::InvalidData(_)));
    }
}
