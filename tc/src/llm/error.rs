//! Completion transport errors
//!
//! The reasoning layer turns every one of these into a fallback, so the
//! variants exist to drive the retry loop and to make logs say why a card
//! ended up showing offline analysis.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// No key in the environment; the card runs on offline analysis
    #[error("API key variable {env} is not set")]
    MissingApiKey { env: String },

    #[error("Unknown reasoning provider '{0}' (supported: anthropic)")]
    UnknownProvider(String),

    #[error("Throttled by the provider, retry after {retry_after:?}")]
    Throttled { retry_after: Duration },

    #[error("Provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Could not reach the provider: {0}")]
    Transport(#[from] reqwest::Error),

    /// The reply arrived but carried nothing usable
    #[error("Unusable reply: {0}")]
    EmptyReply(String),

    #[error("Reply body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether the same request may succeed if sent again shortly
    ///
    /// Throttling is excluded: its wait is longer than a card should block.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Rejected { status, .. } => matches!(status, 408 | 500 | 502 | 503 | 504 | 529),
            LlmError::Transport(_) => true,
            LlmError::MissingApiKey { .. }
            | LlmError::UnknownProvider(_)
            | LlmError::Throttled { .. }
            | LlmError::EmptyReply(_)
            | LlmError::Json(_) => false,
        }
    }

    /// True when the service was never usable, as opposed to failing a call
    pub fn is_setup_problem(&self) -> bool {
        matches!(self, LlmError::MissingApiKey { .. } | LlmError::UnknownProvider(_))
    }
}
