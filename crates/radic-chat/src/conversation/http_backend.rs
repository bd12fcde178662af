//! `POST /api/chat` client used by front-ends that talk to a running server.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{ChatBackend, TransportError};
use crate::wire::{ChatReply, ChatRequest, ErrorBody};

pub struct HttpChatBackend {
    endpoint: String,
    client: Client,
}

impl HttpChatBackend {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        // A turn includes the whole polling window on the server side.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str::<ChatReply>(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// `details` when the server gave them, else `error`.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    Some(parsed.details.unwrap_or(parsed.error))
}
