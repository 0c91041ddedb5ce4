//! HTTP surface of the gateway.
//!
//! Two routes mirror the public contract: `POST /translate` with a JSON
//! body and `POST /stt` with a multipart `file` field. Stored uploads are
//! served back under the configured public prefix. A handler always answers
//! with well-formed JSON; no failure escapes unhandled.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::transcribe::{TranscriptionGateway, TranscriptionOutcome};
use crate::translate::TranslationOrchestrator;

pub struct AppState {
    pub config: Config,
    pub translator: TranslationOrchestrator,
    pub transcriber: TranscriptionGateway,
}

impl AppState {
    /// Wire up the real providers from the loaded configuration.
    pub fn from_config(config: Config) -> Self {
        let translator = TranslationOrchestrator::with_default_provider(
            config.translate.clone(),
            config.strict_provider_required,
        );
        let transcriber = TranscriptionGateway::with_default_provider(
            config.transcribe.clone(),
            config.server.upload_dir.clone(),
            config.server.public_prefix.clone(),
        );
        Self {
            config,
            translator,
            transcriber,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateParams {
    #[serde(default)]
    text: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_body_bytes;
    // The public prefix and the upload directory must point at the same
    // files: the Stored degraded mode hands out public paths under the
    // prefix, so exactly the upload directory is mounted there.
    let public_prefix = state.config.server.public_prefix.clone();
    let upload_dir = state.config.server.upload_dir.clone();

    Router::new()
        .route("/translate", post(translate))
        .route("/stt", post(stt))
        .nest_service(public_prefix.as_str(), ServeDir::new(upload_dir))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until it is shut down.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn translate(
    State(state): State<Arc<AppState>>,
    Json(params): Json<TranslateParams>,
) -> Response {
    match state.translator.translate(&params.text).await {
        Ok(translation) => Json(json!({ "translation": translation.text })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn stt(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return error_response(GatewayError::Unexpected(format!(
                            "failed to read upload: {}",
                            e
                        )))
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return error_response(GatewayError::Validation(format!(
                    "invalid multipart body: {}",
                    e
                )))
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return error_response(GatewayError::Validation("no_file".to_string()));
    };
    if filename.is_empty() {
        return error_response(GatewayError::Validation("no_filename".to_string()));
    }

    match state.transcriber.transcribe(&bytes, &filename).await {
        Ok(TranscriptionOutcome::Transcribed { text }) => {
            Json(json!({ "transcription": text })).into_response()
        }
        Ok(TranscriptionOutcome::Stored { public_path }) => Json(json!({
            "message": "File saved (no STT configured)",
            "file": public_path,
        }))
        .into_response(),
        Ok(TranscriptionOutcome::Failed { reason }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "STT provider error", "details": reason })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Human-readable message for the wire; validation codes come from the core.
fn validation_message(code: &str) -> &str {
    match code {
        "no_text" => "No text provided",
        "no_file" => "No file part",
        "no_filename" => "No selected file",
        other => other,
    }
}

fn error_response(error: GatewayError) -> Response {
    match error {
        GatewayError::Validation(code) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": validation_message(&code) })),
        )
            .into_response(),
        GatewayError::Config(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response(),
        GatewayError::Provider { status, detail } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Translation provider error",
                "status": status,
                "details": detail,
            })),
        )
            .into_response(),
        GatewayError::Transport(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Provider request failed", "details": message })),
        )
            .into_response(),
        other => {
            error!("Unhandled gateway error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TranscribeConfig, TranslateConfig};
    use crate::transcribe::{MockTranscriptionProvider, LocalAudioStore};
    use crate::translate::MockTranslationProvider;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn state(
        translate_config: TranslateConfig,
        strict: bool,
        translation_provider: MockTranslationProvider,
        transcribe_config: TranscribeConfig,
        transcription_provider: MockTranscriptionProvider,
        upload_dir: &std::path::Path,
    ) -> Arc<AppState> {
        let mut config = Config::default();
        config.translate = translate_config.clone();
        config.transcribe = transcribe_config.clone();
        config.strict_provider_required = strict;
        config.server.upload_dir = upload_dir.to_string_lossy().to_string();

        let translator = TranslationOrchestrator::new(
            translate_config,
            strict,
            Box::new(translation_provider),
        );
        let transcriber = TranscriptionGateway::new(
            transcribe_config,
            Box::new(LocalAudioStore::new(upload_dir, "/static/uploads")),
            Box::new(transcription_provider),
        );

        Arc::new(AppState {
            config,
            translator,
            transcriber,
        })
    }

    fn translate_request(text: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/translate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "text": text }).to_string()))
            .unwrap()
    }

    fn stt_request(filename: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "vietgate-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: audio/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/stt")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn key(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[tokio::test]
    async fn test_translate_success_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockTranslationProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok("Hello, how are you?".to_string()));

        let app = router(state(
            TranslateConfig {
                api_key: key("test"),
                ..TranslateConfig::default()
            },
            false,
            provider,
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            dir.path(),
        ));

        let response = app
            .oneshot(translate_request("Xin chào, bạn khỏe không?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "translation": "Hello, how are you?" })
        );
    }

    #[tokio::test]
    async fn test_translate_empty_text_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(
            TranslateConfig::default(),
            false,
            MockTranslationProvider::new(),
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            dir.path(),
        ));

        let response = app.oneshot(translate_request("   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "No text provided" })
        );
    }

    #[tokio::test]
    async fn test_translate_gated_noise_is_200_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockTranslationProvider::new();
        provider.expect_complete().times(0);

        let app = router(state(
            TranslateConfig {
                api_key: key("test"),
                ..TranslateConfig::default()
            },
            false,
            provider,
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            dir.path(),
        ));

        let response = app.oneshot(translate_request("42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "translation": "" }));
    }

    #[tokio::test]
    async fn test_translate_missing_key_strict_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(
            TranslateConfig::default(),
            true,
            MockTranslationProvider::new(),
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            dir.path(),
        ));

        let response = app
            .oneshot(translate_request("Xin chào bạn"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "GROQ_API_KEY not configured on server" })
        );
    }

    #[tokio::test]
    async fn test_translate_provider_failure_strict_is_500_with_details() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockTranslationProvider::new();
        provider.expect_complete().returning(|_| {
            Err(GatewayError::Provider {
                status: 429,
                detail: json!({ "message": "rate limited" }),
            })
        });

        let app = router(state(
            TranslateConfig {
                api_key: key("test"),
                ..TranslateConfig::default()
            },
            true,
            provider,
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            dir.path(),
        ));

        let response = app
            .oneshot(translate_request("Xin chào bạn"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Translation provider error");
        assert_eq!(body["status"], 429);
    }

    #[tokio::test]
    async fn test_stt_no_key_stores_upload() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(
            TranslateConfig::default(),
            false,
            MockTranslationProvider::new(),
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            dir.path(),
        ));

        let response = app
            .oneshot(stt_request("voice.webm", b"RIFF...."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "message": "File saved (no STT configured)",
                "file": "/static/uploads/voice.webm",
            })
        );
        assert_eq!(
            std::fs::read(dir.path().join("voice.webm")).unwrap(),
            b"RIFF...."
        );
    }

    #[tokio::test]
    async fn test_stored_upload_is_served_at_its_public_path() {
        let dir = tempfile::tempdir().unwrap();
        // Non-default upload directory; the public prefix must still resolve
        let upload_dir = dir.path().join("audio");
        let app = router(state(
            TranslateConfig::default(),
            false,
            MockTranslationProvider::new(),
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            &upload_dir,
        ));

        let response = app
            .clone()
            .oneshot(stt_request("voice.webm", b"RIFF...."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let public_path = body["file"].as_str().unwrap().to_string();
        assert_eq!(public_path, "/static/uploads/voice.webm");

        let request = Request::builder()
            .uri(&public_path)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"RIFF....");
    }

    #[tokio::test]
    async fn test_stt_with_key_returns_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockTranscriptionProvider::new();
        provider
            .expect_transcribe()
            .returning(|_, _| Ok("xin chào".to_string()));

        let app = router(state(
            TranslateConfig::default(),
            false,
            MockTranslationProvider::new(),
            TranscribeConfig {
                api_key: key("test"),
                ..TranscribeConfig::default()
            },
            provider,
            dir.path(),
        ));

        let response = app
            .oneshot(stt_request("voice.webm", b"RIFF...."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "transcription": "xin chào" })
        );
    }

    #[tokio::test]
    async fn test_stt_provider_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockTranscriptionProvider::new();
        provider
            .expect_transcribe()
            .returning(|_, _| Err(GatewayError::Transport("timed out".to_string())));

        let app = router(state(
            TranslateConfig::default(),
            false,
            MockTranslationProvider::new(),
            TranscribeConfig {
                api_key: key("test"),
                ..TranscribeConfig::default()
            },
            provider,
            dir.path(),
        ));

        let response = app
            .oneshot(stt_request("voice.webm", b"RIFF...."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "STT provider error");
    }

    #[tokio::test]
    async fn test_stt_missing_file_part_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(
            TranslateConfig::default(),
            false,
            MockTranslationProvider::new(),
            TranscribeConfig::default(),
            MockTranscriptionProvider::new(),
            dir.path(),
        ));

        let boundary = "vietgate-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/stt")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "No file part" }));
    }
}
