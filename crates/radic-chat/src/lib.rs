pub mod assistant;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod sanitize;
pub mod wire;

// Re-export primary types for convenience
pub use config::{AssistantConfig, PollPolicy};
pub use error::{ChatError, Result};
pub use orchestrator::{TurnOrchestrator, TurnOutcome, INVALID_THREAD_ID, MESSAGE_REQUIRED};

pub use assistant::{AssistantService, OpenAiAssistant, RunStatus};
#[cfg(any(test, feature = "test-support"))]
pub use assistant::ScriptedAssistant;

pub use conversation::{ChatBackend, ConversationView, HttpChatBackend, QuickAction, Role, Turn, ViewStatus};
pub use render::{render, RenderSegment};
pub use sanitize::{clean_citations, strip_annotations, CitationCleaner};
pub use wire::{ChatReply, ChatRequest, ErrorBody};
