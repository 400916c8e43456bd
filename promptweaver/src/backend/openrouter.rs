//! OpenRouter chat-completions backend.

use super::{CompletionBackend, CompletionRequest};
use crate::config::WeaverConfig;
use crate::errors::{BackendError, ConfigError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

const REFERER: &str = "https://github.com/promptweaver/promptweaver-rust";
const APP_TITLE: &str = "promptweaver";
const ERROR_BODY_LIMIT: usize = 300;

/// Connection settings for [`OpenRouterBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRouterSettings {
    /// Bearer token; a missing or blank key fails [`CompletionBackend::check_ready`].
    pub api_key: Option<String>,
    /// Model identifier, e.g. `openrouter/auto`.
    pub model_id: String,
    /// API root, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl OpenRouterSettings {
    /// Extracts the backend settings from a loaded configuration.
    ///
    /// Logs a warning when no model id is configured and the default is used.
    #[must_use]
    pub fn from_config(config: &WeaverConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model_id: config.effective_model_id(),
            base_url: config.base_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Backend calling an OpenRouter-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    client: reqwest::Client,
    settings: OpenRouterSettings,
}

impl OpenRouterBackend {
    /// Creates a backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the HTTP client cannot be built.
    pub fn new(settings: OpenRouterSettings) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    /// Creates a backend from a loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`OpenRouterBackend::new`].
    pub fn from_config(config: &WeaverConfig) -> Result<Self, ConfigError> {
        Self::new(OpenRouterSettings::from_config(config))
    }

    /// Returns the model this backend requests.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    fn body(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.settings.model_id.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.role.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt(),
                },
            ],
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    fn check_ready(&self) -> Result<(), ConfigError> {
        match self.api_key() {
            Some(_) => Ok(()),
            None => Err(ConfigError::missing_credential(API_KEY_VAR)),
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let api_key = self
            .api_key()
            .ok_or_else(|| BackendError::Unauthorized(format!("{API_KEY_VAR} is not set")))?;

        debug!(
            provider = "openrouter",
            model = %self.settings.model_id,
            stage = %request.stage,
            prompt_chars = request.prompt().len(),
            "Invoking OpenRouter backend"
        );

        let response = self
            .client
            .post(self.settings.endpoint())
            .bearer_auth(api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| BackendError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transient(format!("reading response failed: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }
        parse_completion(&text)
    }
}

/// Maps a non-success HTTP status to a backend error.
fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let message = format!("HTTP {status}: {snippet}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            BackendError::Transient(message)
        }
        s if s.is_server_error() => BackendError::Transient(message),
        _ => BackendError::InvalidResponse(message),
    }
}

/// Extracts the first choice's content from a response body.
fn parse_completion(body: &str) -> Result<String, BackendError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::InvalidResponse(format!("unparseable response: {e}")))?;

    if let Some(error) = parsed.error {
        return Err(BackendError::Transient(format!(
            "provider error: {}",
            error.message
        )));
    }

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(content)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
