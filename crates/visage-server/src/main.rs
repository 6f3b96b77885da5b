//! Visage server binary — the entry point for the avatar chat service.
//!
//! Starts an axum HTTP server with structured logging, collaborator client
//! construction, and graceful shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use visage_server::middleware::RateLimiter;
use visage_server::{app, background, config, AppState};
use visage_voice::{LlmConfig, ReplyService, SpeechConfig, SpeechService};

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("VISAGE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Collaborator credentials are environment-sourced; refuse to start
    // without them.
    let llm_config = LlmConfig::from_env()
        .expect("language-model credentials missing — set OPENAI_API_KEY");
    let speech_config = SpeechConfig::from_env()
        .expect("speech credentials missing — set SPEECH_KEY, SPEECH_REGION and SPEECH_VOICE");

    let reply = ReplyService::new(llm_config).expect("failed to build language-model client");
    let speech = SpeechService::new(speech_config);

    let audio_dir = PathBuf::from(&config.audio.dir);
    tokio::fs::create_dir_all(&audio_dir)
        .await
        .expect("failed to create audio artifact directory — check audio.dir in config");

    let state = AppState {
        reply: Arc::new(reply),
        speech: Arc::new(speech),
        rate_limiter: RateLimiter::new(),
        chat_limit: config.rate_limit.chat_limit,
        audio_dir: audio_dir.clone(),
    };

    // Start the artifact sweep
    tokio::spawn(background::start_sweep_task(
        audio_dir,
        config.audio.sweep_after_secs,
    ));

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting visage server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    tracing::info!("visage server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
