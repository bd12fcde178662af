//! Conversation View
//!
//! Holds one session's transcript and drives the request/await/append cycle
//! against a [`ChatBackend`]. Front-ends (terminal, web, tests) only read the
//! transcript and status; every change goes through `submit` and `receive`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::{render, RenderSegment};
use crate::wire::{ChatReply, ChatRequest};

pub mod http_backend;

pub use http_backend::HttpChatBackend;

pub const GREETING: &str = "Hello! 👋 I'm your CA Enrollment Assistant.

I can help you with:
• Subject details
• Fees, discounts and offers
• Enrollment process
• Payment information

What would you like to know?";

/// Shown in place of an answer whenever the request fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn segments(&self) -> Vec<RenderSegment> {
        render(&self.content)
    }
}

/// Append-only, chronological list of turns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    fn push(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    Idle,
    /// A request is in flight; input is disabled and a typing indicator shows.
    AwaitingResponse,
}

/// Preset questions. Picking one fills the draft; it never sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Eligibility,
    Fees,
    Deadlines,
    Contact,
}

impl QuickAction {
    pub const ALL: [QuickAction; 4] = [Self::Eligibility, Self::Fees, Self::Deadlines, Self::Contact];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Eligibility => "Eligibility",
            Self::Fees => "Fees",
            Self::Deadlines => "Deadlines",
            Self::Contact => "Contact",
        }
    }

    pub fn query(&self) -> &'static str {
        match self {
            Self::Eligibility => "What are the eligibility criteria?",
            Self::Fees => "What are the fees?",
            Self::Deadlines => "What are the important deadlines?",
            Self::Contact => "How can I contact support?",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label().eq_ignore_ascii_case(label.trim()))
    }
}

// ============================================================================
// Backend boundary
// ============================================================================

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server answered {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status { status: u16, message: Option<String> },

    #[error("unreadable response: {0}")]
    Decode(String),
}

/// Request/response boundary between the view and the turn orchestrator.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

// ============================================================================
// View
// ============================================================================

pub struct ConversationView {
    transcript: Transcript,
    thread_id: Option<String>,
    status: ViewStatus,
    draft: String,
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationView {
    /// Fresh session: greeting only, no thread yet.
    pub fn new() -> Self {
        let mut transcript = Transcript::default();
        transcript.push(Turn::new(Role::Assistant, GREETING));
        Self {
            transcript,
            thread_id: None,
            status: ViewStatus::Idle,
            draft: String::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn apply_quick_action(&mut self, action: QuickAction) {
        self.draft = action.query().to_string();
    }

    pub fn can_send(&self) -> bool {
        self.status == ViewStatus::Idle && !self.draft.trim().is_empty()
    }

    /// Move the draft into the transcript and build the outgoing request.
    /// Returns `None` (and changes nothing) when sending is not allowed.
    pub fn submit(&mut self) -> Option<ChatRequest> {
        if !self.can_send() {
            return None;
        }
        let message = std::mem::take(&mut self.draft);
        self.transcript.push(Turn::new(Role::User, message.clone()));
        self.status = ViewStatus::AwaitingResponse;
        Some(ChatRequest::new(message, self.thread_id.clone()))
    }

    /// Record the outcome of the pending request. Failures become the fixed
    /// fallback turn. Returns `None` if no request was pending.
    pub fn receive(&mut self, result: Result<ChatReply, TransportError>) -> Option<&Turn> {
        if self.status != ViewStatus::AwaitingResponse {
            tracing::debug!("Dropping reply with no pending request");
            return None;
        }
        self.status = ViewStatus::Idle;

        let content = match result {
            Ok(reply) => {
                if self.thread_id.is_none() && !reply.thread_id.is_empty() {
                    tracing::debug!(thread_id = %reply.thread_id, "Adopted conversation thread");
                    self.thread_id = Some(reply.thread_id);
                }
                reply.response
            }
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        };
        Some(self.transcript.push(Turn::new(Role::Assistant, content)))
    }

    /// `submit`, await the backend, then `receive`.
    pub async fn send(&mut self, backend: &dyn ChatBackend) -> Option<&Turn> {
        let request = self.submit()?;
        let result = backend.send(&request).await;
        self.receive(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    enum Scripted {
        Reply(&'static str, &'static str),
        Fail,
    }

    struct FakeBackend {
        script: Mutex<Vec<Scripted>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl FakeBackend {
        fn new(mut script: Vec<Scripted>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
            self.seen.lock().push(request.clone());
            match self.script.lock().pop() {
                Some(Scripted::Reply(response, thread_id)) => Ok(ChatReply {
                    response: response.into(),
                    thread_id: thread_id.into(),
                }),
                Some(Scripted::Fail) | None => Err(TransportError::Status { status: 500, message: None }),
            }
        }
    }

    #[test]
    fn starts_with_greeting() {
        let view = ConversationView::new();
        assert_eq!(view.transcript().len(), 1);
        let greeting = &view.transcript().turns()[0];
        assert_eq!(greeting.role, Role::Assistant);
        assert!(greeting.content.contains("CA Enrollment Assistant"));
        assert_eq!(view.status(), ViewStatus::Idle);
        assert!(view.thread_id().is_none());
    }

    #[test]
    fn greeting_renders_with_line_breaks() {
        let segments = ConversationView::new().transcript().turns()[0].segments();
        assert!(segments.contains(&RenderSegment::LineBreak));
        assert_eq!(segments[0], RenderSegment::text("Hello! 👋 I'm your CA Enrollment Assistant."));
    }

    #[test]
    fn quick_action_only_fills_draft() {
        let mut view = ConversationView::new();
        view.apply_quick_action(QuickAction::Fees);
        assert_eq!(view.draft(), "What are the fees?");
        assert_eq!(view.transcript().len(), 1);
        assert_eq!(QuickAction::from_label(" deadlines "), Some(QuickAction::Deadlines));
        assert_eq!(QuickAction::from_label("nope"), None);
    }

    #[test]
    fn blank_draft_is_not_sent() {
        let mut view = ConversationView::new();
        view.set_draft("   ");
        assert!(!view.can_send());
        assert!(view.submit().is_none());
        assert_eq!(view.transcript().len(), 1);
    }

    #[test]
    fn only_one_turn_in_flight() {
        let mut view = ConversationView::new();
        view.set_draft("first");
        assert!(view.submit().is_some());
        assert_eq!(view.status(), ViewStatus::AwaitingResponse);
        assert_eq!(view.draft(), "");

        view.set_draft("second");
        assert!(view.submit().is_none());
        assert_eq!(view.transcript().len(), 2);
    }

    #[test]
    fn stray_reply_is_ignored() {
        let mut view = ConversationView::new();
        let reply = ChatReply { response: "late".into(), thread_id: "thread_1".into() };
        assert!(view.receive(Ok(reply)).is_none());
        assert_eq!(view.transcript().len(), 1);
    }

    #[tokio::test]
    async fn adopts_first_thread_and_reuses_it() {
        let backend = FakeBackend::new(vec![
            Scripted::Reply("Fees are 10000.", "thread_1"),
            Scripted::Reply("Apply by June.", "thread_other"),
        ]);
        let mut view = ConversationView::new();

        view.set_draft("What are the fees?");
        let turn = view.send(&backend).await.unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "Fees are 10000.");
        assert_eq!(view.thread_id(), Some("thread_1"));

        view.apply_quick_action(QuickAction::Deadlines);
        view.send(&backend).await.unwrap();
        assert_eq!(view.thread_id(), Some("thread_1"));

        let seen = backend.seen.lock();
        assert_eq!(seen[0].thread_id, None);
        assert_eq!(seen[1].thread_id.as_deref(), Some("thread_1"));
        assert_eq!(seen[1].message.as_deref(), Some("What are the important deadlines?"));

        let roles: Vec<Role> = view.transcript().turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn transport_failure_appends_fallback() {
        let backend = FakeBackend::new(vec![Scripted::Fail]);
        let mut view = ConversationView::new();
        view.set_draft("hello");

        let turn = view.send(&backend).await.unwrap();
        assert_eq!(turn.content, FALLBACK_REPLY);
        assert_eq!(view.status(), ViewStatus::Idle);
        assert!(view.thread_id().is_none());
        assert!(!view.can_send());
    }
}
