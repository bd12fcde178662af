//! Error taxonomy for a chat turn.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Bad caller input (empty message and the like)
    #[error("{0}")]
    Validation(String),

    /// The run reached a terminal state other than `completed`
    #[error("Run failed with status: {status}")]
    Upstream { run_id: String, status: String },

    /// The run completed but produced no assistant message
    #[error("No assistant response found for run {0}")]
    NotFound(String),

    /// Polling budget exhausted before the run finished
    #[error("Run {run_id} did not finish after {polls} status checks ({elapsed_ms} ms)")]
    Timeout {
        run_id: String,
        polls: u32,
        elapsed_ms: u64,
    },

    /// The caller cancelled the turn while the run was in flight
    #[error("Run {run_id} was cancelled by the caller")]
    Cancelled { run_id: String },

    /// Non-2xx answer from the Assistant Service
    #[error("Assistant API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the failure is the caller's fault and maps to a 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_carries_status() {
        let err = ChatError::Upstream {
            run_id: "run_1".into(),
            status: "expired".into(),
        };
        assert_eq!(err.to_string(), "Run failed with status: expired");
        assert!(!err.is_client_error());
    }

    #[test]
    fn only_validation_is_client_error() {
        assert!(ChatError::validation("Message is required").is_client_error());
        assert!(!ChatError::NotFound("run_1".into()).is_client_error());
        assert!(!ChatError::config("missing key").is_client_error());
    }
}
