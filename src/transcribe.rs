//! Transcription gateway: durable storage first, provider second.
//!
//! Uploaded audio is always persisted before any provider call so the
//! artifact survives provider failure. When no speech-to-text key is
//! configured the gateway returns the stored path instead; that is the
//! designed degraded mode, not an error.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::TranscribeConfig;
use crate::error::{GatewayError, Result};

/// Outcome of a transcription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    /// The provider returned a transcript.
    Transcribed { text: String },
    /// No provider configured; the upload was stored and is reachable here.
    Stored { public_path: String },
    /// The provider was called and failed.
    Failed { reason: String },
}

/// Location of a persisted upload.
#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub path: PathBuf,
    pub public_path: String,
}

/// Durable storage for uploaded audio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioStore: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<StoredAudio>;
}

/// A speech-to-text provider returning the transcript for raw audio bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String>;
}

/// Filesystem-backed audio store serving files under a public URL prefix.
pub struct LocalAudioStore {
    upload_dir: PathBuf,
    public_prefix: String,
}

impl LocalAudioStore {
    pub fn new(upload_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            public_prefix: public_prefix.into(),
        }
    }
}

#[async_trait]
impl AudioStore for LocalAudioStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<StoredAudio> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let path = self.upload_dir.join(filename);
        tokio::fs::write(&path, bytes).await?;

        debug!("Stored upload at {}", path.display());

        Ok(StoredAudio {
            public_path: format!("{}/{}", self.public_prefix, filename),
            path,
        })
    }
}

/// Reduce an untrusted upload filename to a safe single path component.
///
/// Path separators and anything outside `[A-Za-z0-9._-]` become underscores;
/// leading/trailing dots and underscores are stripped so the result can
/// neither traverse directories nor hide as a dotfile.
pub fn sanitize_filename(filename: &str) -> String {
    let name: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let name = name.trim_matches(|c| c == '.' || c == '_');
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: Option<String>,
    transcription: Option<String>,
}

/// Whisper-style multipart transcription client.
pub struct WhisperClient {
    client: Client,
    config: TranscribeConfig,
}

impl WhisperClient {
    pub fn new(config: TranscribeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }
}

#[async_trait]
impl TranscriptionProvider for WhisperClient {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Config("transcription API key not configured".to_string()))?;

        let form = Form::new()
            .part(
                "file",
                Part::bytes(audio.to_vec()).file_name(filename.to_string()),
            )
            .text("model", self.config.model.clone());

        debug!("Sending transcription request to: {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("transcription request failed: {}", e)))?;

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

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed provider response: {}", e)))?;

        // Provider variants disagree on the field name
        Ok(parsed
            .text
            .or(parsed.transcription)
            .unwrap_or_default())
    }
}

/// Selects between the transcription provider and raw storage based on
/// whether a provider key is configured.
pub struct TranscriptionGateway {
    config: TranscribeConfig,
    store: Box<dyn AudioStore>,
    provider: Box<dyn TranscriptionProvider>,
}

impl TranscriptionGateway {
    pub fn new(
        config: TranscribeConfig,
        store: Box<dyn AudioStore>,
        provider: Box<dyn TranscriptionProvider>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
        }
    }

    /// Build a gateway backed by the local filesystem store and the real
    /// Whisper client.
    pub fn with_default_provider(
        config: TranscribeConfig,
        upload_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> Self {
        let store = Box::new(LocalAudioStore::new(upload_dir, public_prefix));
        let provider = Box::new(WhisperClient::new(config.clone()));
        Self::new(config, store, provider)
    }

    pub async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<TranscriptionOutcome> {
        if audio.is_empty() {
            return Err(GatewayError::Validation("no_file".to_string()));
        }
        if filename.trim().is_empty() {
            return Err(GatewayError::Validation("no_filename".to_string()));
        }

        let filename = sanitize_filename(filename);

        // Persist before any provider call so the artifact survives failure
        let stored = self.store.save(&filename, audio).await?;

        if self.config.api_key.is_none() {
            info!("No transcription key configured, returning stored path");
            return Ok(TranscriptionOutcome::Stored {
                public_path: stored.public_path,
            });
        }

        match self.provider.transcribe(audio, &filename).await {
            Ok(text) => Ok(TranscriptionOutcome::Transcribed { text }),
            Err(e) => {
                warn!("Transcription provider failed: {}", e);
                Ok(TranscriptionOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }
}
