//! JSON bodies of `POST /api/chat`, shared by the server and the chat client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, thread_id: Option<String>) -> Self {
        Self {
            message: Some(message.into()),
            thread_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), details: None }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case_and_sends_null_thread() {
        let value = serde_json::to_value(ChatRequest::new("What are the fees?", None)).unwrap();
        assert_eq!(value, json!({ "message": "What are the fees?", "threadId": null }));
    }

    #[test]
    fn request_tolerates_missing_fields() {
        let request: ChatRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request, ChatRequest::default());

        let request: ChatRequest = serde_json::from_value(json!({ "message": null, "threadId": "thread_1" })).unwrap();
        assert!(request.message.is_none());
        assert_eq!(request.thread_id.as_deref(), Some("thread_1"));
    }

    #[test]
    fn error_body_omits_missing_details() {
        assert_eq!(
            serde_json::to_value(ErrorBody::new("Method not allowed")).unwrap(),
            json!({ "error": "Method not allowed" })
        );
    }
}
