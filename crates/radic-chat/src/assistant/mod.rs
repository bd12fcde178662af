//! Assistant Service seam
//!
//! The hosted assistant owns threads, runs and messages. The orchestrator only
//! talks to it through [`AssistantService`], so the HTTP client and the scripted
//! test double are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

pub mod openai;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

pub use openai::OpenAiAssistant;
#[cfg(any(test, feature = "test-support"))]
pub use scripted::ScriptedAssistant;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// One assistant computation against a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }

    /// Polling stops once this is true.
    ///
    /// `requires_action` counts as terminal: nothing here submits tool outputs,
    /// so the run would only sit there until it expires.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Failed
                | Self::Cancelled
                | Self::Expired
                | Self::Incomplete
                | Self::RequiresAction
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    ImageFile { image_file: serde_json::Value },
    ImageUrl { image_url: serde_json::Value },
    Refusal { refusal: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Half-open `[start_index, end_index)` span to delete before display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub text: Option<String>,
}

impl Annotation {
    pub fn span(start_index: usize, end_index: usize) -> Self {
        Self { start_index, end_index, text: None }
    }
}

impl ThreadMessage {
    /// Assistant-authored text message, mostly for tests and fakes.
    pub fn assistant_text(id: impl Into<String>, run_id: impl Into<String>, text: impl Into<String>, annotations: Vec<Annotation>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            run_id: Some(run_id.into()),
            content: vec![MessageContent::Text {
                text: TextContent { value: text.into(), annotations },
            }],
        }
    }
}

// ============================================================================
// Service trait
// ============================================================================

/// Operations the orchestrator needs from the hosted assistant.
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a user message to the thread.
    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<()>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Messages of the thread, newest first. `run_id` narrows the listing when
    /// the service supports it; callers still filter by run themselves.
    async fn list_messages(&self, thread_id: &str, run_id: Option<&str>) -> Result<Vec<ThreadMessage>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_status_parses_known_and_unknown() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1", "thread_id": "thread_1", "status": "in_progress", "object": "thread.run"
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(!run.status.is_terminal());

        let status: RunStatus = serde_json::from_value(json!("something_new")).unwrap();
        assert_eq!(status, RunStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        for status in [RunStatus::Failed, RunStatus::Cancelled, RunStatus::Expired] {
            assert!(status.is_terminal());
            assert!(!status.is_success());
        }
        assert!(RunStatus::Completed.is_success());
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Cancelling.is_terminal());
    }

    #[test]
    fn message_content_blocks_deserialize() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "object": "thread.message",
            "role": "assistant",
            "run_id": "run_1",
            "content": [
                {
                    "type": "text",
                    "text": {
                        "value": "Fees are 10000【4:0†source】.",
                        "annotations": [
                            { "type": "file_citation", "text": "【4:0†source】", "start_index": 14, "end_index": 26,
                              "file_citation": { "file_id": "file-1" } }
                        ]
                    }
                },
                { "type": "image_file", "image_file": { "file_id": "file-2" } },
                { "type": "some_future_block" }
            ]
        }))
        .unwrap();

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content.len(), 3);
        match &message.content[0] {
            MessageContent::Text { text } => {
                assert_eq!(text.annotations, vec![Annotation {
                    start_index: 14,
                    end_index: 26,
                    text: Some("【4:0†source】".into()),
                }]);
            }
            other => panic!("expected text block, got {:?}", other),
        }
        assert!(matches!(message.content[2], MessageContent::Other));
    }
}
