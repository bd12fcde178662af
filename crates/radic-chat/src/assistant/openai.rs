//! Hosted Assistants (v2) REST client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::{AssistantService, Run, Thread, ThreadMessage};
use crate::config::AssistantConfig;
use crate::error::{ChatError, Result};

/// HTTP implementation of [`AssistantService`].
pub struct OpenAiAssistant {
    base_url: Url,
    api_key: String,
    organization: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

impl OpenAiAssistant {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ChatError::config(format!("Invalid base_url '{}': {}", config.base_url, e)))?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            organization: config.organization.clone(),
            client,
        })
    }

    /// Append `segments` to the base url, percent-encoding each one so ids can
    /// never add path components or a query.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || **s == "." || **s == "..") {
            return Err(ChatError::validation(format!("Invalid path segment '{}'", bad)));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ChatError::config(format!("base_url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2");
        match &self.organization {
            Some(org) => builder.header("OpenAI-Organization", org),
            None => builder,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, builder: RequestBuilder, endpoint: &Url) -> Result<T> {
        let response = self.authorized(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(endpoint = %endpoint, "Assistant API request timed out");
            } else if e.is_connect() {
                tracing::warn!(endpoint = %endpoint, "Failed to connect to Assistant API: {}", e);
            }
            ChatError::Http(e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Self::parse_json_response(response, endpoint).await
    }

    /// Parse a response body as JSON, returning a clear error if the server returned HTML.
    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &Url,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: format!("{} returned HTML instead of JSON: {}", endpoint, preview),
            });
        }
        Ok(serde_json::from_str::<T>(&body)?)
    }
}

/// Pull `error.message` out of an API error body, or fall back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect())
}

#[async_trait]
impl AssistantService for OpenAiAssistant {
    async fn create_thread(&self) -> Result<Thread> {
        let endpoint = self.endpoint(&["threads"])?;
        self.send(self.client.post(endpoint.clone()).json(&json!({})), &endpoint).await
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let endpoint = self.endpoint(&["threads", thread_id, "messages"])?;
        let request = json!({ "role": "user", "content": content });
        let _: serde_json::Value = self.send(self.client.post(endpoint.clone()).json(&request), &endpoint).await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let endpoint = self.endpoint(&["threads", thread_id, "runs"])?;
        let request = json!({ "assistant_id": assistant_id });
        self.send(self.client.post(endpoint.clone()).json(&request), &endpoint).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let endpoint = self.endpoint(&["threads", thread_id, "runs", run_id])?;
        self.send(self.client.get(endpoint.clone()), &endpoint).await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let endpoint = self.endpoint(&["threads", thread_id, "runs", run_id, "cancel"])?;
        self.send(self.client.post(endpoint.clone()), &endpoint).await
    }

    async fn list_messages(&self, thread_id: &str, run_id: Option<&str>) -> Result<Vec<ThreadMessage>> {
        let endpoint = self.endpoint(&["threads", thread_id, "messages"])?;
        let mut query: Vec<(&str, &str)> = vec![("order", "desc"), ("limit", "100")];
        if let Some(run_id) = run_id {
            query.push(("run_id", run_id));
        }
        let list: MessageList = self.send(self.client.get(endpoint.clone()).query(&query), &endpoint).await?;
        Ok(list.data)
    }
}
