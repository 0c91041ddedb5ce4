use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

fn default_translate_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_transcribe_endpoint() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub translate: TranslateConfig,
    pub transcribe: TranscribeConfig,
    /// When true, missing provider keys and provider failures are surfaced
    /// as errors instead of degraded to empty results.
    pub strict_provider_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub host: String,
    /// Port to bind the HTTP server to
    pub port: u16,
    /// Directory where uploaded audio files are stored
    pub upload_dir: String,
    /// Public URL prefix under which stored uploads are served
    pub public_prefix: String,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Provider API key; absent means the translation provider is disabled
    pub api_key: Option<String>,
    /// Chat-completion model used for translation
    pub model: String,
    /// Chat-completion endpoint URL
    pub endpoint: String,
    /// Hard timeout for a single provider call
    pub timeout_secs: u64,
    /// Output budget passed to the provider
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscribeConfig {
    /// Provider API key; absent means uploads are stored without transcription
    pub api_key: Option<String>,
    /// Speech-to-text model identifier
    pub model: String,
    /// Transcription endpoint URL
    pub endpoint: String,
    /// Hard timeout for a single provider call; audio processing is slow
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            translate: TranslateConfig::default(),
            transcribe: TranscribeConfig::default(),
            strict_provider_required: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: "static/uploads".to_string(),
            public_prefix: "/static/uploads".to_string(),
            max_body_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            endpoint: default_translate_endpoint(),
            timeout_secs: 30,
            max_tokens: 1000,
        }
    }
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "whisper-1".to_string(),
            endpoint: default_transcribe_endpoint(),
            timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::error::GatewayError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Overlay environment variables on top of the loaded configuration.
    ///
    /// The gateway is deployed with env-based configuration; a config file is
    /// optional and the environment always wins.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            if !key.is_empty() {
                self.translate.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("GROQ_MODEL") {
            if !model.is_empty() {
                self.translate.model = model;
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.transcribe.api_key = Some(key);
            }
        }
        if let Ok(strict) = std::env::var("STRICT_PROVIDER_REQUIRED") {
            self.strict_provider_required = matches!(
                strict.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            if !dir.is_empty() {
                self.server.upload_dir = dir;
            }
        }
        if let Ok(host) = std::env::var("HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    /// Load configuration from an optional file path, then the environment.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_deployment() {
        let config = Config::default();
        assert!(config.translate.api_key.is_none());
        assert!(config.transcribe.api_key.is_none());
        assert!(!config.strict_provider_required);
        assert_eq!(config.translate.timeout_secs, 30);
        assert_eq!(config.transcribe.timeout_secs, 120);
        assert_eq!(config.server.max_body_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            strict_provider_required = true

            [translate]
            model = "llama-3.1-8b-instant"
            "#,
        )
        .unwrap();

        assert!(config.strict_provider_required);
        assert_eq!(config.translate.model, "llama-3.1-8b-instant");
        assert_eq!(config.transcribe.model, "whisper-1");
        assert_eq!(config.server.port, 5000);
    }
}
