//! API handlers for the Visage server.

use crate::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Extension, Json, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::Stream;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use uuid::Uuid;
use visage_types::{SpeechStyle, VisemeEvent};

/// Read size for streaming audio artifacts to the caller.
const STREAM_CHUNK_BYTES: usize = 64 * 1024;

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message. Required; must not be empty.
    pub message: Option<String>,
}

/// Response body for a completed chat round trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Reply text produced by the language model.
    pub response: String,
    /// Delivery style chosen for the reply.
    pub style: SpeechStyle,
    /// The model's one-line justification for the style.
    pub reasoning: String,
    /// Artifact filename redeemable once at the audio endpoint.
    pub audio: String,
    /// Viseme timeline for the audio, offsets in centiseconds.
    pub visemes: Vec<VisemeEvent>,
}

/// API error type mapping to HTTP status codes.
///
/// Collaborator and filesystem failures all collapse into `Processing`:
/// the caller sees one generic message while the detail goes to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("not found")]
    NotFound,
    #[error("processing error")]
    Processing,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Processing => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

/// Handler for `POST /api/chat`.
///
/// Runs the full round trip: validate and sanitize the message, generate a
/// styled reply, synthesize it, park the audio on disk, and return the
/// composed result. Every stage failure is terminal for the request;
/// nothing is retried.
pub async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    // A body that does not decode (broken JSON, non-string message) is the
    // same input error as a missing message.
    let Json(payload) = payload.map_err(|_| ApiError::BadRequest("message required"))?;
    let raw = payload.message.unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("message required"));
    }

    let message = sanitize_message(&raw);
    // A message that was nothing but markup sanitizes down to whitespace
    // and never reaches the collaborators.
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("message required"));
    }

    let reply = state.reply.generate(&message).await.map_err(|e| {
        tracing::error!(error = %e, "reply generation failed");
        ApiError::Processing
    })?;

    let synthesis = state
        .speech
        .synthesize(&reply.text, reply.style)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, style = %reply.style, "speech synthesis failed");
            ApiError::Processing
        })?;

    let filename = format!("response_{}.mp3", Uuid::new_v4());
    tokio::fs::create_dir_all(&state.audio_dir).await.map_err(|e| {
        tracing::error!(error = %e, dir = %state.audio_dir.display(), "failed to create audio directory");
        ApiError::Processing
    })?;
    let path = state.audio_dir.join(&filename);
    tokio::fs::write(&path, &synthesis.audio).await.map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "failed to write audio artifact");
        ApiError::Processing
    })?;

    tracing::info!(
        filename = %filename,
        style = %reply.style,
        audio_bytes = synthesis.audio.len(),
        viseme_count = synthesis.visemes.len(),
        "chat round trip complete"
    );

    Ok(Json(ChatResponse {
        response: reply.text,
        style: reply.style,
        reasoning: reply.rationale,
        audio: filename,
        visemes: synthesis.visemes,
    }))
}

/// Handler for `GET /api/audio/{filename}`.
///
/// Streams one artifact as a download and removes it once the stream is
/// fully drained, so each filename is redeemable once. Names that do not
/// match the artifact pattern are treated as unknown.
pub async fn audio_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_artifact_name(&filename) {
        return Err(ApiError::NotFound);
    }

    let path = state.audio_dir.join(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => {
            tracing::error!(error = %e, filename = %filename, "failed to open audio artifact");
            return Err(ApiError::Processing);
        }
    };

    let body = Body::from_stream(artifact_stream(file, path));
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(body)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build audio response");
            ApiError::Processing
        })?;
    Ok(response)
}

/// Accepts exactly the names the chat handler generates:
/// `response_<uuid>.mp3`. Everything else, including path traversal
/// attempts, is unknown.
fn is_artifact_name(filename: &str) -> bool {
    filename
        .strip_prefix("response_")
        .and_then(|rest| rest.strip_suffix(".mp3"))
        .is_some_and(|id| Uuid::parse_str(id).is_ok())
}

/// Streams the artifact in chunks and removes the file once fully drained.
///
/// A consumer that disconnects mid-stream leaves the artifact behind for
/// the background sweep.
fn artifact_stream(
    file: tokio::fs::File,
    path: PathBuf,
) -> impl Stream<Item = std::io::Result<Vec<u8>>> {
    enum State {
        Reading { file: tokio::fs::File, path: PathBuf },
        Finished,
    }

    futures_util::stream::unfold(State::Reading { file, path }, |state| async move {
        match state {
            State::Reading { mut file, path } => {
                let mut buf = vec![0u8; STREAM_CHUNK_BYTES];
                match file.read(&mut buf).await {
                    Ok(0) => {
                        drop(file);
                        if let Err(e) = tokio::fs::remove_file(&path).await {
                            tracing::warn!(
                                error = %e,
                                path = %path.display(),
                                "failed to remove delivered audio artifact"
                            );
                        }
                        None
                    }
                    Ok(n) => {
                        buf.truncate(n);
                        Some((Ok(buf), State::Reading { file, path }))
                    }
                    Err(e) => Some((Err(e), State::Finished)),
                }
            }
            State::Finished => None,
        }
    })
}

/// Strips markup from untrusted input, keeping visible text content.
///
/// Script and style subtrees are dropped wholesale; every other element is
/// replaced by its text. Input without a `<` passes through untouched, and
/// a stray `<` that opens no tag (as in "3 < 5") survives parsing as text.
fn sanitize_message(input: &str) -> String {
    if !input.contains('<') {
        return input.to_string();
    }

    let fragment = Html::parse_fragment(input);
    let mut text = String::new();
    for node in fragment.root_element().descendants() {
        if let Some(chunk) = node.value().as_text() {
            let suppressed = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| matches!(element.name(), "script" | "style"))
            });
            if !suppressed {
                text.push_str(chunk);
            }
        }
    }
    text
}
