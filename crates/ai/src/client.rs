// Chat-completions client
//
// Speaks the OpenAI `/chat/completions` wire format, which local servers
// (Ollama, llama.cpp, vLLM) also implement. Blocking: one request at a time.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use outreach_config::ai::ResolvedAIConfig;

const USER_AGENT: &str = concat!("outreach/", env!("CARGO_PKG_VERSION"));

/// One message of a chat exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A complete text-generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Provider requires a key and none was configured
    #[error("API key not configured")]
    MissingKey,
    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),
    /// No response within the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Non-2xx response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Response body was not what the API promises
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A synchronous text-generation service.
///
/// The pipeline only depends on this trait, so tests can substitute a
/// scripted implementation for the HTTP client.
pub trait TextOracle {
    fn complete(&self, request: &ChatRequest) -> Result<String, OracleError>;
}

// ============================================================================
// OpenAI API types
// ============================================================================

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

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Blocking chat-completions client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ChatClient {
    /// Build a client for `endpoint` (API base URL, e.g. `https://api.openai.com/v1`).
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &ResolvedAIConfig) -> Result<Self, OracleError> {
        if config.provider.needs_api_key() && config.api_key.is_none() {
            return Err(OracleError::MissingKey);
        }
        Self::new(config.endpoint.clone(), config.api_key.clone(), config.timeout)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

impl TextOracle for ChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, OracleError> {
        let url = self.completions_url();
        log::debug!("POST {} (model {})", url, request.model);

        let mut builder = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout.as_secs())
            } else {
                OracleError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout.as_secs())
            } else {
                OracleError::Network(e.to_string())
            }
        })?;

        if !status.is_success() {
            log::debug!("{} returned {}", url, status);
            let message = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(error) => error.error.message,
                Err(_) => body,
            };
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_completion(&body)
    }
}

/// Extract `choices[0].message.content` from a completion body.
fn parse_completion(body: &str) -> Result<String, OracleError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::InvalidResponse("No choices in response".to_string()))?
        .message
        .content
        .ok_or_else(|| OracleError::InvalidResponse("Empty message content".to_string()))
}
