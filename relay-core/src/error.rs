//! Client error taxonomy

use crate::conversation::ConversationError;
use crate::request_log::RequestLog;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Classification handed to a [`DecisionHook`](crate::client::DecisionHook)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential rejected by the provider
    KeyExpired,
    RateLimited,
    GenericApiError,
}

/// Errors produced while talking to an LLM provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (DNS, connect, reset, timeout)
    #[error("Connection error: {0}")]
    Connectivity(String),

    /// HTTP 429; `retry_after` is the adapter-computed wait
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Duration,
    },

    /// 2xx response that does not match the expected schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Non-2xx response other than a rate limit
    #[error("API error ({status}): {message}")]
    GenericApi { status: u16, message: String },

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Retries and decision-hook extensions are used up
    #[error("{message}")]
    RetriesExhausted {
        message: String,
        log: Box<RequestLog>,
    },
}

impl LlmError {
    /// Whether the retry engine may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connectivity(_)
                | Self::RateLimited { .. }
                | Self::MalformedResponse(_)
                | Self::GenericApi { .. }
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::GenericApi {
                status: 401 | 403, ..
            } => ErrorKind::KeyExpired,
            _ => ErrorKind::GenericApiError,
        }
    }

    /// Request log of a terminally failed call, if any
    pub fn request_log(&self) -> Option<&RequestLog> {
        match self {
            Self::RetriesExhausted { log, .. } => Some(log),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Connectivity(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Connectivity(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            LlmError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            LlmError::GenericApi {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            LlmError::Connectivity(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(LlmError::Connectivity("reset".into()).is_retryable());
        assert!(LlmError::MalformedResponse("no choices".into()).is_retryable());
        assert!(LlmError::GenericApi {
            status: 500,
            message: "oops".into()
        }
        .is_retryable());
        assert!(LlmError::RateLimited {
            message: "slow down".into(),
            retry_after: Duration::from_secs(1),
        }
        .is_retryable());

        assert!(!LlmError::UnsupportedProvider("foo".into()).is_retryable());
        assert!(!LlmError::from(ConversationError::EmptyContent).is_retryable());
        assert!(!LlmError::Configuration("bad".into()).is_retryable());
    }

    #[test]
    fn test_kind_classification() {
        let unauthorized = LlmError::GenericApi {
            status: 401,
            message: "invalid key".into(),
        };
        assert_eq!(unauthorized.kind(), ErrorKind::KeyExpired);

        let server = LlmError::GenericApi {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(server.kind(), ErrorKind::GenericApiError);
        assert_eq!(
            LlmError::Connectivity("x".into()).kind(),
            ErrorKind::GenericApiError
        );
    }
}
