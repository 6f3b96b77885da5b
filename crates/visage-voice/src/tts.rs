use crate::config::SpeechConfig;
use crate::error::VoiceError;
use crate::protocol::{self, path};
use crate::ssml;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;
use visage_types::{SpeechStyle, VisemeEvent};

/// Timeout for one complete synthesis turn, connection included.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Everything one synthesis turn produces: the complete audio and the
/// viseme timeline in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub audio: Vec<u8>,
    pub visemes: Vec<VisemeEvent>,
}

/// Client for the speech-synthesis collaborator.
///
/// Each call opens one WebSocket session, streams the markup, accumulates
/// audio chunks and viseme notifications as they arrive, and resolves once
/// the service signals the end of the turn. Results are handed back only
/// when complete; a failed turn discards everything collected so far.
#[derive(Debug, Clone)]
pub struct SpeechService {
    config: SpeechConfig,
}

impl SpeechService {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// Synthesizes one utterance in the given style.
    ///
    /// Reply text is escaped before it is embedded in the markup, so it may
    /// contain arbitrary characters.
    pub async fn synthesize(
        &self,
        text: &str,
        style: SpeechStyle,
    ) -> Result<SynthesisResult, VoiceError> {
        let markup = ssml::build_markup(&ssml::escape_text(text), style, &self.config.voice);
        self.run_session(&markup).await
    }

    async fn run_session(&self, markup: &str) -> Result<SynthesisResult, VoiceError> {
        let deadline = tokio::time::Instant::now() + SYNTHESIS_TIMEOUT;
        let mut session = tokio::time::timeout_at(deadline, self.connect())
            .await
            .map_err(|_| timed_out())??;
        let outcome = tokio::time::timeout_at(deadline, drive_turn(&mut session, markup)).await;
        // Release the session on every exit path, the timeout included; a
        // close failure is not interesting once the turn outcome is known.
        let _ = session.close(None).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(timed_out()),
        }
    }

    async fn connect(&self) -> Result<WsStream, VoiceError> {
        let mut request = self
            .config
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| VoiceError::Config(format!("invalid speech endpoint: {}", e)))?;

        let key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|_| VoiceError::Config("speech key is not a valid header value".to_string()))?;
        let connection_id = HeaderValue::from_str(&Uuid::new_v4().simple().to_string())
            .map_err(|_| VoiceError::Config("connection id is not a valid header value".to_string()))?;
        let headers = request.headers_mut();
        headers.insert("Ocp-Apim-Subscription-Key", key);
        headers.insert("X-ConnectionId", connection_id);

        let (stream, _) = tokio_tungstenite::connect_async(request).await.map_err(|e| {
            VoiceError::UpstreamUnavailable(format!("speech service connect failed: {}", e))
        })?;
        tracing::debug!(endpoint = %self.config.endpoint, "speech session opened");
        Ok(stream)
    }
}

fn timed_out() -> VoiceError {
    VoiceError::SynthesisFailed(format!(
        "synthesis timed out after {} seconds",
        SYNTHESIS_TIMEOUT.as_secs()
    ))
}

/// Runs one synthesis turn over an open session.
async fn drive_turn(session: &mut WsStream, markup: &str) -> Result<SynthesisResult, VoiceError> {
    let request_id = Uuid::new_v4().simple().to_string();

    for (path, content_type, body) in [
        (
            path::SPEECH_CONFIG,
            "application/json; charset=utf-8",
            protocol::speech_config(),
        ),
        (
            path::SYNTHESIS_CONTEXT,
            "application/json; charset=utf-8",
            protocol::synthesis_context(),
        ),
        (path::SSML, "application/ssml+xml", markup.to_string()),
    ] {
        let frame = protocol::text_frame(path, &request_id, content_type, &body);
        session.send(Message::text(frame)).await.map_err(|e| {
            VoiceError::UpstreamUnavailable(format!("speech session send failed: {}", e))
        })?;
    }

    let mut audio = Vec::new();
    let mut visemes = Vec::new();

    while let Some(message) = session.next().await {
        let message = message.map_err(|e| {
            VoiceError::SynthesisFailed(format!("speech session read failed: {}", e))
        })?;
        match message {
            Message::Text(frame) => {
                let frame = protocol::parse_text_frame(frame.as_str())?;
                match frame.path.as_str() {
                    path::AUDIO_METADATA => {
                        visemes.extend(protocol::parse_viseme_events(&frame.payload)?);
                    }
                    path::TURN_END => {
                        tracing::debug!(
                            audio_bytes = audio.len(),
                            viseme_count = visemes.len(),
                            "synthesis turn complete"
                        );
                        return Ok(SynthesisResult { audio, visemes });
                    }
                    // turn.start and friends carry nothing we keep.
                    _ => {}
                }
            }
            Message::Binary(frame) => {
                let frame = protocol::parse_binary_frame(&frame)?;
                if frame.path == path::AUDIO {
                    audio.extend_from_slice(&frame.payload);
                }
            }
            Message::Close(reason) => {
                let detail = reason
                    .map(|f| format!("{} {}", f.code, f.reason))
                    .unwrap_or_else(|| "no close frame".to_string());
                return Err(VoiceError::SynthesisFailed(format!(
                    "session closed before turn end: {}",
                    detail
                )));
            }
            // Ping/pong is answered by the transport.
            _ => {}
        }
    }

    Err(VoiceError::SynthesisFailed(
        "session ended before turn end".to_string(),
    ))
}
