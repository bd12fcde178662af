use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{ChatError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Everything the orchestrator needs to talk to the hosted assistant.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub poll: PollPolicy,
}

/// How long and how often a run is polled before giving up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval_ms: u64,
    pub max_polls: u32,
    pub max_wait_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_polls: 120,
            max_wait_secs: 180,
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            organization: None,
            assistant_id: String::new(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll: PollPolicy::default(),
        }
    }
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("organization", &self.organization)
            .field("assistant_id", &self.assistant_id)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll", &self.poll)
            .finish()
    }
}

impl AssistantConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("OPENAI_API_KEY must be set".into());
        }
        if self.assistant_id.trim().is_empty() {
            return Err("ASSISTANT_ID must be set".into());
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("base_url must be an http(s) url, got '{}'", self.base_url));
        }
        if self.poll.interval_ms == 0 {
            return Err("poll.interval_ms must be > 0".into());
        }
        if self.poll.max_polls == 0 {
            return Err("poll.max_polls must be > 0".into());
        }
        if self.poll.max_wait_secs == 0 {
            return Err("poll.max_wait_secs must be > 0".into());
        }
        Ok(())
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = get("OPENAI_API_KEY") {
            config.api_key = key;
        }
        config.organization = get("OPENAI_ORG_ID");
        if let Some(id) = get("ASSISTANT_ID") {
            config.assistant_id = id;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("RADIC_POLL_INTERVAL_MS") {
            config.poll.interval_ms = parse_number("RADIC_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("RADIC_MAX_POLLS") {
            config.poll.max_polls = parse_number("RADIC_MAX_POLLS", &v)?;
        }
        if let Some(v) = get("RADIC_MAX_WAIT_SECS") {
            config.poll.max_wait_secs = parse_number("RADIC_MAX_WAIT_SECS", &v)?;
        }
        Ok(config)
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    /// The api key is not read from disk unless present in the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChatError::config(format!("Failed to read config file: {}", e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ChatError::config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ChatError::config(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn reads_required_and_optional_keys() {
        let config = AssistantConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_ORG_ID", "org-1"),
            ("ASSISTANT_ID", "asst_1"),
            ("RADIC_POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.organization.as_deref(), Some("org-1"));
        assert_eq!(config.assistant_id, "asst_1");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.max_polls, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_org_is_unset() {
        let config = AssistantConfig::from_lookup(lookup_from(&[("OPENAI_ORG_ID", "  ")])).unwrap();
        assert!(config.organization.is_none());
    }

    #[test]
    fn bad_number_is_config_error() {
        let err = AssistantConfig::from_lookup(lookup_from(&[("RADIC_MAX_POLLS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn validate_names_missing_fields() {
        let config = AssistantConfig::default();
        assert_eq!(config.validate().unwrap_err(), "OPENAI_API_KEY must be set");

        let config = AssistantConfig {
            api_key: "sk-test".into(),
            ..AssistantConfig::default()
        };
        assert_eq!(config.validate().unwrap_err(), "ASSISTANT_ID must be set");

        let config = AssistantConfig {
            api_key: "sk-test".into(),
            assistant_id: "asst_1".into(),
            poll: PollPolicy { max_polls: 0, ..PollPolicy::default() },
            ..AssistantConfig::default()
        };
        assert_eq!(config.validate().unwrap_err(), "poll.max_polls must be > 0");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AssistantConfig {
            api_key: "sk-very-secret".into(),
            ..AssistantConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn file_fields_default_when_missing() {
        let dir = std::env::temp_dir().join(format!("radic-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("assistant.json");
        std::fs::write(&path, r#"{ "assistant_id": "asst_9", "poll": { "interval_ms": 10, "max_polls": 3, "max_wait_secs": 5 } }"#).unwrap();

        let config = AssistantConfig::from_file(&path).unwrap();
        assert_eq!(config.assistant_id, "asst_9");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.poll.max_polls, 3);
        assert!(config.api_key.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
