//! Translation orchestration: gate, provider call, sanitize.
//!
//! The orchestrator owns every fallback path of a translation request. By
//! default provider trouble degrades to an empty translation so the calling
//! surface has "nothing to show" instead of a raw provider error; strict
//! mode surfaces those failures for deployments that monitor them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TranslateConfig;
use crate::error::{GatewayError, Result};
use crate::{gate, sanitize};

/// System instruction constraining the model to pure translation.
const SYSTEM_PROMPT: &str = "You are a professional Vietnamese to English translator. \
    Translate the text accurately and naturally. Only provide the translation, \
    no explanations, no preamble, and do not repeat the source text.";

/// A finished translation. Gated or degraded requests carry an empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
}

/// A chat-completion provider returning the raw (unsanitized) completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn complete(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// OpenAI-compatible chat-completion client (Groq by default).
pub struct ChatCompletionClient {
    client: Client,
    config: TranslateConfig,
}

impl ChatCompletionClient {
    pub fn new(config: TranslateConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }
}

#[async_trait]
impl TranslationProvider for ChatCompletionClient {
    async fn complete(&self, text: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Config("translation API key not configured".to_string()))?;

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
            max_tokens: self.config.max_tokens,
        };

        debug!("Sending translation request to: {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("translation request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.text().await {
                Ok(body) => serde_json::from_str(&body)
                    .unwrap_or_else(|_| serde_json::Value::String(body)),
                Err(_) => serde_json::Value::Null,
            };
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed provider response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                GatewayError::Transport("provider response contained no choices".to_string())
            })?;

        Ok(content)
    }
}

/// Composes the language gate, a translation provider, and the output
/// sanitizer into one request/response cycle.
pub struct TranslationOrchestrator {
    config: TranslateConfig,
    strict: bool,
    provider: Box<dyn TranslationProvider>,
}

impl TranslationOrchestrator {
    pub fn new(config: TranslateConfig, strict: bool, provider: Box<dyn TranslationProvider>) -> Self {
        Self {
            config,
            strict,
            provider,
        }
    }

    /// Build an orchestrator backed by the real chat-completion client.
    pub fn with_default_provider(config: TranslateConfig, strict: bool) -> Self {
        let provider = Box::new(ChatCompletionClient::new(config.clone()));
        Self::new(config, strict, provider)
    }

    /// Translate `text`, or return an empty translation when the input is not
    /// worth a provider call or the provider is unavailable (non-strict).
    pub async fn translate(&self, text: &str) -> Result<Translation> {
        if text.trim().is_empty() {
            return Err(GatewayError::Validation("no_text".to_string()));
        }

        // Noise (emoji, punctuation, bare numbers) is silently ignored rather
        // than rejected: the caller should show nothing, not an error.
        if gate::letter_count(text) < 2 {
            debug!("Input has too few letters, skipping provider call");
            return Ok(Translation {
                text: String::new(),
            });
        }

        if !gate::classify(text) {
            debug!("Input did not pass the language gate, skipping provider call");
            return Ok(Translation {
                text: String::new(),
            });
        }

        if self.config.api_key.is_none() {
            if self.strict {
                return Err(GatewayError::Config(
                    "GROQ_API_KEY not configured on server".to_string(),
                ));
            }
            debug!("No translation API key configured, returning empty translation");
            return Ok(Translation {
                text: String::new(),
            });
        }

        match self.provider.complete(text).await {
            Ok(raw) => Ok(Translation {
                text: sanitize::sanitize(&raw),
            }),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!("Translation provider failed, degrading to empty result: {}", e);
                Ok(Translation {
                    text: String::new(),
                })
            }
        }
    }
}
