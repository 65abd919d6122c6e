use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{env_lookup, parse_env, EnvLookup, ProviderSection};
use crate::models::{ChatMessage, ChatModel, ModelError};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 5;

const INITIAL_BACKOFF_SECONDS: f64 = 1.0;
const BACKOFF_FACTOR: f64 = 1.8;

#[derive(Clone, Debug, PartialEq)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub temperature: Option<f32>,
}

impl OpenAiSettings {
    /// Environment wins over the `[provider]` section. The API key is only read from the
    /// environment.
    pub fn resolve(section: &ProviderSection) -> anyhow::Result<Self> {
        Self::resolve_with(section, &env_lookup)
    }

    pub fn resolve_with(section: &ProviderSection, env: &EnvLookup) -> anyhow::Result<Self> {
        let api_key = env("OPENAI_API_KEY").ok_or_else(|| {
            anyhow!("OPENAI_API_KEY is not configured. Set it in the environment.")
        })?;
        let model = env("OPENAI_MODEL")
            .or_else(|| section.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = env("OPENAI_BASE_URL")
            .or_else(|| section.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let max_retries = parse_env(env, "OPENAI_MAX_RETRIES")?
            .or(section.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let timeout_seconds = parse_env(env, "OPENAI_TIMEOUT_SECONDS")?
            .or(section.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        let temperature = parse_env(env, "OPENAI_TEMPERATURE")?.or(section.temperature);
        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            timeout_seconds,
            temperature,
        })
    }
}

/// OpenAI-compatible chat-completions client in JSON-object response mode.
pub struct OpenAiChatClient {
    settings: OpenAiSettings,
    client: Client,
}

enum AttemptError {
    Retry(String),
    Stop(String),
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(settings: OpenAiSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("build http client")?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    fn request_body(&self, messages: &[ChatMessage]) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "messages": messages,
            "response_format": {"type": "json_object"},
        });
        if let (Some(t), Some(obj)) = (self.settings.temperature, body.as_object_mut()) {
            obj.insert("temperature".to_string(), json!(t));
        }
        body
    }

    fn attempt(&self, body: &Value) -> Result<Value, AttemptError> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(body)
            .send()
            .map_err(|e| AttemptError::Retry(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(classify_status(status, detail.trim()));
        }

        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| AttemptError::Retry(format!("invalid completion payload: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "{}".to_string());
        parse_content(&content)
    }
}

fn classify_status(status: StatusCode, detail: &str) -> AttemptError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AttemptError::Stop(
            "rate limit or quota exceeded; check billing settings or slow down requests".to_string(),
        ),
        StatusCode::UNAUTHORIZED => {
            AttemptError::Stop("authentication failed; verify the API key".to_string())
        }
        StatusCode::FORBIDDEN => AttemptError::Stop(
            "permission denied; ensure the key has access to the project".to_string(),
        ),
        StatusCode::BAD_REQUEST => AttemptError::Stop(format!("request rejected: {detail}")),
        _ => AttemptError::Retry(format!("http status {status}")),
    }
}

fn parse_content(content: &str) -> Result<Value, AttemptError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| AttemptError::Retry(format!("response content is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(AttemptError::Retry(
            "response content is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

impl ChatModel for OpenAiChatClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    fn complete(&mut self, messages: &[ChatMessage]) -> Result<Value, ModelError> {
        let body = self.request_body(messages);
        let attempts = self.settings.max_retries.max(1);
        let mut delay = INITIAL_BACKOFF_SECONDS;
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.attempt(&body) {
                Ok(value) => return Ok(value),
                Err(AttemptError::Stop(msg)) => return Err(ModelError::Fatal(msg)),
                Err(AttemptError::Retry(msg)) => last_error = msg,
            }
            if attempt < attempts {
                std::thread::sleep(Duration::from_secs_f64(delay));
                delay *= BACKOFF_FACTOR;
            }
        }
        Err(ModelError::Transient(format!(
            "{last_error} (after {attempts} attempts)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn api_key_is_required() {
        let err = OpenAiSettings::resolve_with(&ProviderSection::default(), &env_of(&[]))
            .expect_err("missing key");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn env_overrides_file_section() {
        let section = ProviderSection {
            model: Some("from-file".into()),
            max_retries: Some(2),
            temperature: Some(0.3),
            ..ProviderSection::default()
        };
        let env = env_of(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "from-env"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ]);
        let s = OpenAiSettings::resolve_with(&section, &env).expect("settings");
        assert_eq!(s.model, "from-env");
        assert_eq!(s.base_url, "http://localhost:8080/v1");
        assert_eq!(s.max_retries, 2);
        assert_eq!(s.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(s.temperature, Some(0.3));
    }

    #[test]
    fn bad_numeric_env_names_the_variable() {
        let env = env_of(&[("OPENAI_API_KEY", "k"), ("OPENAI_MAX_RETRIES", "many")]);
        let err = OpenAiSettings::resolve_with(&ProviderSection::default(), &env)
            .expect_err("invalid int");
        assert!(err.to_string().contains("OPENAI_MAX_RETRIES"));
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            AttemptError::Stop(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            AttemptError::Stop(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            AttemptError::Retry(_)
        ));
    }

    #[test]
    fn content_must_be_an_object() {
        assert!(parse_content(r#"{"a": "b"}"#).is_ok());
        assert!(matches!(parse_content("[1, 2]"), Err(AttemptError::Retry(_))));
        assert!(matches!(parse_content("not json"), Err(AttemptError::Retry(_))));
    }

    #[test]
    fn request_body_carries_json_mode_and_temperature() {
        let settings = OpenAiSettings {
            api_key: "k".into(),
            model: "m".into(),
            base_url: DEFAULT_BASE_URL.into(),
            max_retries: 1,
            timeout_seconds: 5,
            temperature: Some(0.5),
        };
        let client = OpenAiChatClient::new(settings).expect("client");
        let body = client.request_body(&[ChatMessage::user("hi")]);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["temperature"], json!(0.5f32));
        assert_eq!(client.model(), "m");
    }
}
