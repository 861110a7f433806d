//! OpenAI-compatible chat-completions client.
//!
//! Transport and authorization failures degrade to an empty completion:
//! the loop's decoders already treat empty text as "no usable output".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::CompletionOracle;
use crate::config::{self, Settings};
use crate::error::{Error, Result};

/// Default chat-completions endpoint
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Oracle connection settings.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OracleConfig {
    /// Read oracle settings (`AI_API_KEY`, `AI_API_URL`, `AI_MODEL`, ...).
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.get(config::AI_API_KEY).map(str::to_string),
            api_url: settings.get_or(config::AI_API_URL, DEFAULT_API_URL),
            model: settings.get_or(config::AI_MODEL, DEFAULT_MODEL),
            temperature: settings.get_number(config::AI_TEMPERATURE, DEFAULT_TEMPERATURE),
            max_tokens: settings.get_number(config::AI_MAX_TOKENS, DEFAULT_MAX_TOKENS as f64)
                as u32,
            timeout: Duration::from_secs(
                settings.get_number(config::AI_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS as f64) as u64,
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP completion oracle.
#[derive(Clone)]
pub struct HttpOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

impl HttpOracle {
    /// Create a client from explicit configuration.
    pub fn new(config: OracleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client from key/value settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(OracleConfig::from_settings(settings))
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    async fn request(&self, api_key: &str, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::oracle(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::oracle(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::oracle(format!("Invalid response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| Error::oracle("Response contained no choices"))
    }
}

#[async_trait]
impl CompletionOracle for HttpOracle {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            warn!("No API key configured, returning empty completion");
            return Ok(String::new());
        };

        debug!(
            model = %self.config.model,
            system_chars = system_prompt.len(),
            user_chars = user_prompt.len(),
            "Requesting completion"
        );

        match self.request(api_key, system_prompt, user_prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                error!("Completion request failed: {}", e);
                warn!("Falling back to empty completion");
                Ok(String::new())
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}
