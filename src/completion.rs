use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::config::CompletionConfig;

const SYSTEM_PROMPT: &str = "You are an expert full-stack developer and code generator. Generate clean, production-ready, well-structured code based on user requirements. Always return valid JSON when requested.";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("GROK_API_KEY is not configured. Add your API key to the .env file and restart the server.")]
    NotConfigured,
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion service rejected credentials: {0}")]
    Auth(String),
    #[error("completion service returned status={status} body={body}")]
    Status { status: StatusCode, body: String },
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// A text-in, text-out chat completion endpoint.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (xAI Grok by default).
pub struct GrokClient {
    client: Client,
    config: CompletionConfig,
    timeout: Duration,
}

impl GrokClient {
    pub fn new(config: CompletionConfig, timeout: Duration) -> Self {
        match &config.api_key {
            Some(key) => info!("Using completion API key: {}...", key.chars().take(6).collect::<String>()),
            None => tracing::warn!("⚠️ GROK_API_KEY is not set. Generation will fail until it is configured."),
        }
        Self { client: Client::new(), config, timeout }
    }
}

#[async_trait]
impl CompletionService for GrokClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self.config.api_key.as_deref().ok_or(CompletionError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));

        let request_body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        info!("🔗 Requesting completion from {} (model {}, {} prompt chars)", url, self.config.model, prompt.len());

        let response = self.client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.timeout)
                } else {
                    CompletionError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("❌ Completion API error response: {}", preview(&response_text, 500));
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CompletionError::Auth(api_error_message(&response_text).unwrap_or_else(|| status.to_string()))
                }
                _ => CompletionError::Status {
                    status,
                    body: api_error_message(&response_text).unwrap_or_else(|| preview(&response_text, 500)),
                },
            });
        }

        extract_completion(&response_text)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice { message: ChatMessage }

#[derive(Debug, Deserialize)]
struct ChatMessage { #[serde(default)] content: Option<String> }

#[derive(Debug, Deserialize)]
struct ApiErrorBody { error: ApiErrorDetail }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorDetail {
    Object { message: String },
    Text(String),
}

fn extract_completion(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::Malformed(format!("parse error: {}: {}", e, preview(body, 200))))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| CompletionError::Malformed("no completion content in response".into()))
}

fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| match b.error {
        ApiErrorDetail::Object { message } => message,
        ApiErrorDetail::Text(text) => text,
    })
}

/// Shortens long text for log lines without splitting a UTF-8 character.
pub fn preview(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[{} bytes total]", &text[..end], text.len())
}
