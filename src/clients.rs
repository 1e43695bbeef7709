use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::retry::RetryPolicy;

pub mod analyst;
pub mod naver;
pub mod selector;
pub mod tavily;
pub mod telegram;

/// Failure classes for the rate-limited chat services. Callers map each
/// class to its retry treatment through [`ServiceError::retry_delay`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service rate limited the request")]
    RateLimited,
    #[error("service upstream error status {status}")]
    Upstream { status: StatusCode },
    #[error("service request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("service reply malformed: {reason}")]
    Malformed { reason: String },
    #[error("service rejected the request with status {status}")]
    NonRetryable { status: StatusCode },
}

impl ServiceError {
    /// Classifies a non-success HTTP status. Returns `None` for success.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            None
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Some(Self::RateLimited)
        } else if status.is_server_error() {
            Some(Self::Upstream { status })
        } else {
            Some(Self::NonRetryable { status })
        }
    }

    /// Delay before the next attempt, or `None` when the error must not be
    /// retried. Malformed replies retry immediately; rate limits back off
    /// linearly; upstream and network failures wait the fixed delay.
    #[must_use]
    pub fn retry_delay(&self, policy: &RetryPolicy, attempt: u32) -> Option<Duration> {
        match self {
            Self::Malformed { .. } => Some(Duration::ZERO),
            Self::RateLimited => Some(policy.rate_limit_delay(attempt)),
            Self::Upstream { .. } | Self::Network(_) => Some(policy.failure_delay()),
            Self::NonRetryable { .. } => None,
        }
    }
}

/// Chat-completion wire shapes, shared by the selector and the analyst
/// clients (both speak the same completion API dialect).
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessageBody,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageBody {
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    /// Extracts the first assistant message, if any.
    #[must_use]
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
    }
}
