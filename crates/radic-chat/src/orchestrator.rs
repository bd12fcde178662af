//! Turn Orchestrator
//!
//! One call drives one conversational turn to completion: make sure a thread
//! exists, append the user message, start a run, poll it to a terminal status,
//! then pull the run's assistant message and sanitize it.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::assistant::{AssistantService, MessageContent, MessageRole, Run, ThreadMessage};
use crate::config::{AssistantConfig, PollPolicy};
use crate::error::{ChatError, Result};
use crate::sanitize::{strip_annotations, CitationCleaner};

pub const MESSAGE_REQUIRED: &str = "Message is required";
pub const INVALID_THREAD_ID: &str = "Invalid threadId";

/// Final answer of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub answer: String,
    pub thread_id: String,
}

pub struct TurnOrchestrator {
    service: Arc<dyn AssistantService>,
    assistant_id: String,
    poll: PollPolicy,
    cleaner: CitationCleaner,
}

impl TurnOrchestrator {
    pub fn new(service: Arc<dyn AssistantService>, assistant_id: impl Into<String>, poll: PollPolicy) -> Self {
        Self {
            service,
            assistant_id: assistant_id.into(),
            poll,
            cleaner: CitationCleaner::default(),
        }
    }

    pub fn from_config(service: Arc<dyn AssistantService>, config: &AssistantConfig) -> Self {
        Self::new(service, config.assistant_id.clone(), config.poll.clone())
    }

    pub async fn run_turn(&self, user_text: &str, thread_id: Option<&str>) -> Result<TurnOutcome> {
        self.run_turn_with_cancel(user_text, thread_id, &CancellationToken::new()).await
    }

    /// Same as [`run_turn`](Self::run_turn), but gives up when `cancel` fires
    /// while the run is being polled.
    pub async fn run_turn_with_cancel(
        &self,
        user_text: &str,
        thread_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        if user_text.trim().is_empty() {
            return Err(ChatError::validation(MESSAGE_REQUIRED));
        }

        let thread_id = thread_id.filter(|id| !id.is_empty());
        if let Some(id) = thread_id {
            if !is_valid_id(id) {
                tracing::info!(len = id.len(), "Rejected malformed thread id");
                return Err(ChatError::validation(INVALID_THREAD_ID));
            }
        }

        let thread_id = match thread_id {
            Some(id) => id.to_string(),
            None => {
                let thread = self.service.create_thread().await?;
                tracing::info!(thread_id = %thread.id, "Created conversation thread");
                thread.id
            }
        };

        self.service.add_user_message(&thread_id, user_text).await?;
        let run = self.service.create_run(&thread_id, &self.assistant_id).await?;
        tracing::info!(thread_id = %thread_id, run_id = %run.id, message_len = user_text.len(), "Started run");

        self.wait_for_completion(&thread_id, &run, cancel).await?;

        let messages = self.service.list_messages(&thread_id, Some(&run.id)).await?;
        let message = select_run_message(&messages, &run.id)
            .ok_or_else(|| ChatError::NotFound(run.id.clone()))?;

        let answer = self.cleaner.clean(&extract_text(message));
        tracing::info!(thread_id = %thread_id, run_id = %run.id, answer_len = answer.len(), "Turn completed");

        Ok(TurnOutcome { answer, thread_id })
    }

    /// Poll until the run is terminal, the budget runs out, or `cancel` fires.
    async fn wait_for_completion(&self, thread_id: &str, run: &Run, cancel: &CancellationToken) -> Result<()> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let current = self.service.retrieve_run(thread_id, &run.id).await?;
            polls += 1;
            tracing::debug!(run_id = %run.id, status = %current.status, polls, "Polled run status");

            if current.status.is_success() {
                return Ok(());
            }
            if current.status.is_terminal() {
                tracing::warn!(run_id = %run.id, status = %current.status, "Run ended without completing");
                return Err(ChatError::Upstream {
                    run_id: run.id.clone(),
                    status: current.status.to_string(),
                });
            }

            let elapsed = started.elapsed();
            if polls >= self.poll.max_polls || elapsed + self.poll.interval() > self.poll.max_wait() {
                tracing::warn!(run_id = %run.id, polls, elapsed_ms = elapsed.as_millis() as u64, "Run polling budget exhausted");
                self.cancel_quietly(thread_id, &run.id).await;
                return Err(ChatError::Timeout {
                    run_id: run.id.clone(),
                    polls,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(run_id = %run.id, "Turn cancelled by caller");
                    self.cancel_quietly(thread_id, &run.id).await;
                    return Err(ChatError::Cancelled { run_id: run.id.clone() });
                }
                _ = tokio::time::sleep(self.poll.interval()) => {}
            }
        }
    }

    /// Best effort: a run we stop waiting on should not keep the thread busy.
    async fn cancel_quietly(&self, thread_id: &str, run_id: &str) {
        if let Err(e) = self.service.cancel_run(thread_id, run_id).await {
            tracing::warn!(run_id, "Failed to cancel run: {}", e);
        }
    }
}

/// Thread ids are opaque but always plain `[A-Za-z0-9_-]` tokens.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The assistant message produced by `run_id`.
///
/// Exactly one match is expected; if the listing holds more, the first one in
/// listing order wins.
pub fn select_run_message<'a>(messages: &'a [ThreadMessage], run_id: &str) -> Option<&'a ThreadMessage> {
    let mut matches = messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant && m.run_id.as_deref() == Some(run_id));
    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        tracing::warn!(run_id, extra, "Multiple assistant messages for one run, using the first listed");
    }
    first
}

/// Concatenate the text blocks of `message`, each stripped with its own annotations.
pub fn extract_text(message: &ThreadMessage) -> String {
    message
        .content
        .iter()
        .filter_map(|block| match block {
            MessageContent::Text { text } => Some(strip_annotations(&text.value, &text.annotations)),
            _ => None,
        })
        .collect()
}
