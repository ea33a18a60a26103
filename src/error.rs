// src/error.rs
// Error taxonomy for the quiz pipeline.
// Only configuration failures and exhausted generation retries are meant to
// reach a caller; everything else degrades to fewer items.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
    /// Missing or unusable generative-model credentials. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The generative endpoint kept timing out on read.
    #[error("generative model timed out after {attempts} attempts")]
    GatewayTimeout { attempts: u32 },

    /// Non-timeout failure talking to the generative endpoint.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Scrape or verification source could not be reached.
    #[error("knowledge source unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Caller-side deadline on the whole cascade.
    #[error("quiz generation exceeded {0:?}")]
    Timeout(Duration),
}

impl QuizError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::AdapterUnavailable(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Machine-readable category exposed to API clients.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::GatewayTimeout { .. } => "gateway_timeout",
            Self::Upstream(_) => "upstream",
            Self::AdapterUnavailable(_) => "adapter_unavailable",
            Self::InvalidInput(_) => "invalid_input",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Generic text that is safe to show to end users.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "The quiz service is not configured correctly.",
            Self::GatewayTimeout { .. } | Self::Timeout(_) => {
                "Quiz generation took too long. Please try again."
            }
            Self::Upstream(_) | Self::AdapterUnavailable(_) => {
                "Quiz generation failed. Please try again later."
            }
            Self::InvalidInput(_) => "The request was invalid.",
        }
    }
}

pub type Result<T> = std::result::Result<T, QuizError>;
