//! In-memory Assistant Service for tests.
//!
//! Each created run replays the configured status sequence one entry per
//! `retrieve_run`, then sticks on the last entry. Call counters let tests check
//! side effects (threads created, polls issued, cancellations).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use super::{Annotation, AssistantService, MessageRole, Run, RunStatus, Thread, ThreadMessage};
use crate::error::{ChatError, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallCounts {
    pub threads_created: usize,
    pub messages_added: usize,
    pub runs_created: usize,
    pub status_polls: usize,
    pub runs_cancelled: usize,
    pub message_lists: usize,
}

/// What the assistant says when a run completes.
#[derive(Debug, Clone)]
enum Reply {
    Text { text: String, annotations: Vec<Annotation> },
    Nothing,
}

#[derive(Debug, Default)]
struct State {
    calls: CallCounts,
    next_id: usize,
    statuses: Vec<RunStatus>,
    reply: Option<Reply>,
    /// run id -> polls served so far
    polls: HashMap<String, usize>,
    answered: HashSet<String>,
    /// thread id -> messages, oldest first
    threads: HashMap<String, Vec<ThreadMessage>>,
    user_messages: Vec<(String, String)>,
    fail_create_run: Option<String>,
}

pub struct ScriptedAssistant {
    state: Mutex<State>,
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAssistant {
    /// Runs complete on the first poll and answer "ok".
    pub fn new() -> Self {
        let state = State {
            statuses: vec![RunStatus::Completed],
            reply: Some(Reply::Text { text: "ok".into(), annotations: Vec::new() }),
            ..State::default()
        };
        Self { state: Mutex::new(state) }
    }

    pub fn with_statuses(self, statuses: Vec<RunStatus>) -> Self {
        self.state.lock().statuses = statuses;
        self
    }

    pub fn with_reply(self, text: impl Into<String>, annotations: Vec<Annotation>) -> Self {
        self.state.lock().reply = Some(Reply::Text { text: text.into(), annotations });
        self
    }

    /// Completed runs leave no assistant message behind.
    pub fn without_reply(self) -> Self {
        self.state.lock().reply = Some(Reply::Nothing);
        self
    }

    /// Pre-existing thread, as if created by an earlier session.
    pub fn with_thread(self, thread_id: impl Into<String>) -> Self {
        self.state.lock().threads.insert(thread_id.into(), Vec::new());
        self
    }

    /// Seed a message directly into a thread's history.
    pub fn push_message(&self, thread_id: &str, message: ThreadMessage) {
        self.state
            .lock()
            .threads
            .entry(thread_id.to_string())
            .or_default()
            .push(message);
    }

    pub fn fail_create_run(self, message: impl Into<String>) -> Self {
        self.state.lock().fail_create_run = Some(message.into());
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls.clone()
    }

    /// (thread id, content) of every user message received.
    pub fn user_messages(&self) -> Vec<(String, String)> {
        self.state.lock().user_messages.clone()
    }

    fn next_id(state: &mut State, prefix: &str) -> String {
        state.next_id += 1;
        format!("{}_{}", prefix, state.next_id)
    }
}

fn unknown_thread(thread_id: &str) -> ChatError {
    ChatError::Api {
        status: 404,
        message: format!("No thread found with id '{}'.", thread_id),
    }
}

#[async_trait]
impl AssistantService for ScriptedAssistant {
    async fn create_thread(&self) -> Result<Thread> {
        let mut state = self.state.lock();
        state.calls.threads_created += 1;
        let id = Self::next_id(&mut state, "thread");
        state.threads.insert(id.clone(), Vec::new());
        Ok(Thread { id })
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.messages_added += 1;
        if !state.threads.contains_key(thread_id) {
            return Err(unknown_thread(thread_id));
        }
        let id = Self::next_id(&mut state, "msg");
        state.user_messages.push((thread_id.to_string(), content.to_string()));
        if let Some(messages) = state.threads.get_mut(thread_id) {
            messages.push(ThreadMessage {
                id,
                role: MessageRole::User,
                run_id: None,
                content: Vec::new(),
            });
        }
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> Result<Run> {
        let mut state = self.state.lock();
        state.calls.runs_created += 1;
        if let Some(message) = state.fail_create_run.clone() {
            return Err(ChatError::Api { status: 500, message });
        }
        if !state.threads.contains_key(thread_id) {
            return Err(unknown_thread(thread_id));
        }
        let id = Self::next_id(&mut state, "run");
        state.polls.insert(id.clone(), 0);
        Ok(Run {
            id,
            thread_id: thread_id.to_string(),
            status: RunStatus::Queued,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let mut state = self.state.lock();
        state.calls.status_polls += 1;
        let served = state.polls.get(run_id).copied().ok_or_else(|| ChatError::Api {
            status: 404,
            message: format!("No run found with id '{}'.", run_id),
        })?;
        state.polls.insert(run_id.to_string(), served + 1);

        let status = state
            .statuses
            .get(served)
            .or_else(|| state.statuses.last())
            .cloned()
            .unwrap_or(RunStatus::Completed);

        // Completion drops the assistant's answer into the thread, newest first on listing.
        if status.is_success() && state.answered.insert(run_id.to_string()) {
            if let Some(Reply::Text { text, annotations }) = state.reply.clone() {
                let id = Self::next_id(&mut state, "msg");
                let message = ThreadMessage::assistant_text(id, run_id, text, annotations);
                state.threads.entry(thread_id.to_string()).or_default().push(message);
            }
        }

        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status,
        })
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let mut state = self.state.lock();
        state.calls.runs_cancelled += 1;
        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status: RunStatus::Cancelling,
        })
    }

    async fn list_messages(&self, thread_id: &str, run_id: Option<&str>) -> Result<Vec<ThreadMessage>> {
        let mut state = self.state.lock();
        state.calls.message_lists += 1;
        let messages = state.threads.get(thread_id).ok_or_else(|| unknown_thread(thread_id))?;
        Ok(messages
            .iter()
            .rev()
            .filter(|m| run_id.is_none() || m.run_id.as_deref() == run_id)
            .cloned()
            .collect())
    }
}
