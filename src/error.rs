//! LazyWrite Error Types
//!
//! Attempt-level classification ([`Failure`]) and the terminal error taxonomy
//! ([`LazywriteError`]) surfaced to callers, plus the mapping of terminal
//! errors onto HTTP status codes and response bodies.

use crate::config::Environment;
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default retry hint handed to clients when a rate limit carries none
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Classification of a single failed provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider signalled quota or rate exhaustion for the credential used
    RateLimited,

    /// Provider refused the prompt on policy grounds
    ContentRejected,

    /// Network-level failure that is safe to retry
    Transient,

    /// Anything else
    Fatal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ContentRejected => "content_rejected",
            FailureKind::Transient => "transient",
            FailureKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A classified failure from one provider attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,

    /// Retry hint parsed from the provider response (rate limits only)
    pub retry_after: Option<Duration>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            kind: FailureKind::RateLimited,
            message: message.into(),
            retry_after,
        }
    }

    pub fn content_rejected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ContentRejected, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Fatal, message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Failure::transient(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Failure::transient(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Failure::fatal(format!("Failed to decode response: {}", err))
        } else if err.is_request() || err.is_body() {
            // Resets and aborted transfers surface here
            Failure::transient(format!("Request failed: {}", err))
        } else {
            Failure::fatal(err.to_string())
        }
    }
}

/// The last error recorded for one provider of an exhausted chain
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: LazywriteError,
}

/// Main error type for LazyWrite operations
#[derive(Debug, Error)]
pub enum LazywriteError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Empty prompt handed to a generation operation
    #[error("Prompt is required.")]
    EmptyPrompt,

    /// Rate limited by a provider with nothing left to rotate to
    #[error("Rate limited by '{provider}'")]
    RateLimited {
        provider: String,
        retry_after: Option<u64>,
    },

    /// Prompt refused by the provider's content policy
    #[error("Content rejected by '{provider}': {message}")]
    ContentRejected { provider: String, message: String },

    /// Non-retryable failure, or transient failures that ran out of retries
    #[error("Request to '{provider}' failed: {message}")]
    Fatal {
        provider: String,
        message: String,
        /// Set when the failure came from the network (exhausted transients)
        network: bool,
    },

    /// Every credential of the provider's pool is blocked
    #[error("All API keys for '{provider}' are rate limited or blocked.")]
    PoolExhausted {
        provider: String,
        /// Hint from the rate limit that blocked the last key, in seconds
        retry_after: Option<u64>,
    },

    /// Every provider in the chain failed
    #[error("All providers exhausted: {}", summarize(.failures))]
    AllProvidersExhausted { failures: Vec<ProviderFailure> },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn summarize(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.provider, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl LazywriteError {
    /// Build the terminal error for a provider from its last attempt failure
    pub fn from_failure(provider: &str, failure: Failure) -> Self {
        match failure.kind {
            FailureKind::RateLimited => LazywriteError::RateLimited {
                provider: provider.to_string(),
                retry_after: failure.retry_after.map(|d| d.as_secs()),
            },
            FailureKind::ContentRejected => LazywriteError::ContentRejected {
                provider: provider.to_string(),
                message: failure.message,
            },
            FailureKind::Transient => LazywriteError::Fatal {
                provider: provider.to_string(),
                message: failure.message,
                network: true,
            },
            FailureKind::Fatal => LazywriteError::Fatal {
                provider: provider.to_string(),
                message: failure.message,
                network: false,
            },
        }
    }

    /// Whether this error originates from rate limiting
    pub fn is_rate_limit(&self) -> bool {
        match self {
            LazywriteError::RateLimited { .. } | LazywriteError::PoolExhausted { .. } => true,
            LazywriteError::AllProvidersExhausted { failures } => {
                failures.iter().any(|f| f.error.is_rate_limit())
            }
            _ => false,
        }
    }

    /// Whether this error originates from network failures only
    pub fn is_network(&self) -> bool {
        match self {
            LazywriteError::Fatal { network, .. } => *network,
            LazywriteError::AllProvidersExhausted { failures } => {
                !failures.is_empty() && failures.iter().all(|f| f.error.is_network())
            }
            _ => false,
        }
    }

    /// Largest retry hint carried by this error, in seconds
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            LazywriteError::RateLimited { retry_after, .. }
            | LazywriteError::PoolExhausted { retry_after, .. } => *retry_after,
            LazywriteError::AllProvidersExhausted { failures } => {
                failures.iter().filter_map(|f| f.error.retry_after()).max()
            }
            _ => None,
        }
    }

    /// HTTP status a boundary layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            LazywriteError::EmptyPrompt | LazywriteError::ContentRejected { .. } => {
                StatusCode::BAD_REQUEST
            }
            e if e.is_rate_limit() => StatusCode::TOO_MANY_REQUESTS,
            e if e.is_network() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body for the HTTP boundary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: StatusCode,

    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_network_error: Option<bool>,

    /// Internal detail, only populated in development
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn from_error(err: &LazywriteError, environment: Environment) -> Self {
        let status = err.status_code();
        let mut response = Self {
            status,
            error: String::new(),
            retry_after: None,
            is_network_error: None,
            details: None,
        };

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                response.error = "We're experiencing high demand. All API keys are currently \
                                  rate-limited. Please try again in a few minutes."
                    .to_string();
                response.retry_after =
                    Some(err.retry_after().unwrap_or(DEFAULT_RETRY_AFTER_SECS));
            }
            StatusCode::BAD_REQUEST => {
                response.error = match err {
                    LazywriteError::EmptyPrompt => err.to_string(),
                    _ => "Please ensure your topic is appropriate for children. \
                          Content filter triggered."
                        .to_string(),
                };
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                response.error = "We're experiencing connectivity issues with our AI \
                                  providers. Please try again later."
                    .to_string();
                response.is_network_error = Some(true);
            }
            _ => {
                response.error = "Failed to generate content. Please try again.".to_string();
                if environment.is_development() {
                    response.details = Some(format!("{:?}", err));
                }
            }
        }

        response
    }
}

/// Result type alias for LazyWrite operations
pub type Result<T> = std::result::Result<T, LazywriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn exhausted(errors: Vec<LazywriteError>) -> LazywriteError {
        LazywriteError::AllProvidersExhausted {
            failures: errors
                .into_iter()
                .enumerate()
                .map(|(i, error)| ProviderFailure {
                    provider: format!("p{}", i),
                    error,
                })
                .collect(),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LazywriteError::PoolExhausted {
                provider: "openrouter".into(),
                retry_after: None,
            }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            LazywriteError::ContentRejected {
                provider: "hf".into(),
                message: "nsfw".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(LazywriteError::EmptyPrompt.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            LazywriteError::Fatal {
                provider: "hf".into(),
                message: "connection refused".into(),
                network: true
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            LazywriteError::Fatal {
                provider: "hf".into(),
                message: "unauthorized".into(),
                network: false
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_exhausted_chain_status() {
        let rate_limited_then_network = exhausted(vec![
            LazywriteError::PoolExhausted {
                provider: "hf".into(),
                retry_after: None,
            },
            LazywriteError::Fatal {
                provider: "craiyon".into(),
                message: "timeout".into(),
                network: true,
            },
        ]);
        assert_eq!(
            rate_limited_then_network.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );

        let all_network = exhausted(vec![LazywriteError::Fatal {
            provider: "craiyon".into(),
            message: "timeout".into(),
            network: true,
        }]);
        assert_eq!(all_network.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        assert_eq!(
            exhausted(vec![]).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_failure() {
        let err = LazywriteError::from_failure(
            "openrouter",
            Failure::rate_limited("429", Some(Duration::from_secs(12))),
        );
        assert_eq!(err.retry_after(), Some(12));
        assert!(err.is_rate_limit());

        let err = LazywriteError::from_failure("openrouter", Failure::transient("reset"));
        assert!(err.is_network());
        assert!(matches!(err, LazywriteError::Fatal { network: true, .. }));
    }

    #[test]
    fn test_error_response_body() {
        let err = LazywriteError::PoolExhausted {
            provider: "openrouter".into(),
            retry_after: None,
        };
        let response = ErrorResponse::from_error(&err, Environment::Production);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["retryAfter"], 60);

        let hinted = LazywriteError::PoolExhausted {
            provider: "openrouter".into(),
            retry_after: Some(30),
        };
        assert_eq!(
            ErrorResponse::from_error(&hinted, Environment::Production).retry_after,
            Some(30)
        );
        assert!(json.get("details").is_none());
        assert!(json.get("status").is_none());

        let err = LazywriteError::Internal("boom".into());
        let prod = ErrorResponse::from_error(&err, Environment::Production);
        assert!(prod.details.is_none());
        let dev = ErrorResponse::from_error(&err, Environment::Development);
        assert!(dev.details.unwrap().contains("boom"));

        let err = LazywriteError::Fatal {
            provider: "p".into(),
            message: "refused".into(),
            network: true,
        };
        let response = ErrorResponse::from_error(&err, Environment::Local);
        assert_eq!(response.is_network_error, Some(true));
    }
}
