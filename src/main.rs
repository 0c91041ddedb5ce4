//! Vietgate - Vietnamese Translation/Transcription Gateway
//!
//! Main entry point: loads configuration from an optional TOML file plus the
//! environment, then either runs the HTTP gateway or performs a one-shot
//! translation/transcription from the command line.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vietgate::cli::{Args, Commands};
use vietgate::config::Config;
use vietgate::server::{self, AppState};
use vietgate::transcribe::{TranscriptionGateway, TranscriptionOutcome};
use vietgate::translate::TranslationOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = Config::load(args.config.as_ref())?;

    match args.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            info!(
                "Starting gateway (translation provider: {}, transcription provider: {})",
                provider_state(config.translate.api_key.is_some()),
                provider_state(config.transcribe.api_key.is_some()),
            );

            let state = Arc::new(AppState::from_config(config));
            server::serve(state).await?;
        }
        Commands::Translate { text } => {
            let orchestrator = TranslationOrchestrator::with_default_provider(
                config.translate.clone(),
                config.strict_provider_required,
            );
            let translation = orchestrator.translate(&text).await?;
            println!("{}", translation.text);
        }
        Commands::Transcribe { input } => {
            let audio = tokio::fs::read(&input).await?;
            let filename = input
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();

            let gateway = TranscriptionGateway::with_default_provider(
                config.transcribe.clone(),
                config.server.upload_dir.clone(),
                config.server.public_prefix.clone(),
            );

            match gateway.transcribe(&audio, &filename).await? {
                TranscriptionOutcome::Transcribed { text } => println!("{}", text),
                TranscriptionOutcome::Stored { public_path } => {
                    println!("File saved (no STT configured): {}", public_path)
                }
                TranscriptionOutcome::Failed { reason } => {
                    anyhow::bail!("transcription failed: {}", reason)
                }
            }
        }
    }

    Ok(())
}

fn provider_state(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "disabled"
    }
}

/// Setup logging to both console and a daily-rotated file.
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".vietgate").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "vietgate.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
