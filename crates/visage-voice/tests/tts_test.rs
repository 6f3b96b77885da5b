use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use visage_types::{SpeechStyle, VisemeEvent};
use visage_voice::{SpeechConfig, SpeechService, VoiceError};

/// What the fake synthesizer does once the markup has arrived.
#[derive(Clone, Copy)]
enum Script {
    /// Stream viseme metadata and two audio chunks, then end the turn.
    Complete,
    /// Close the session mid-turn instead of ending it.
    AbortMidTurn,
    /// Drop the connection after turn.start without a close handshake.
    VanishAfterStart,
}

async fn spawn_synthesizer(script: Script) -> String {
    let app = Router::new().route(
        "/synth",
        get(move |upgrade: WebSocketUpgrade| async move {
            upgrade.on_upgrade(move |socket| run_session(socket, script))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}/synth", addr)
}

async fn run_session(mut socket: WebSocket, script: Script) {
    // The client sends speech.config, synthesis.context, and the markup
    // before the service produces any output.
    let mut request_id = String::new();
    for _ in 0..3 {
        match socket.recv().await {
            Some(Ok(Message::Text(frame))) => {
                if let Some(id) = header(&frame, "X-RequestId") {
                    request_id = id;
                }
            }
            _ => return,
        }
    }

    send_text(&mut socket, "turn.start", &request_id, "{}").await;

    match script {
        Script::Complete => {
            send_text(
                &mut socket,
                "audio.metadata",
                &request_id,
                r#"{"Metadata":[{"Type":"Viseme","Data":{"Offset":500000,"VisemeId":19,"IsLastAnimation":false}}]}"#,
            )
            .await;
            send_audio(&mut socket, &request_id, b"ID3-first-chunk-").await;
            send_audio(&mut socket, &request_id, b"second-chunk").await;
            send_text(
                &mut socket,
                "audio.metadata",
                &request_id,
                r#"{"Metadata":[{"Type":"Viseme","Data":{"Offset":1200000,"VisemeId":0,"IsLastAnimation":true}}]}"#,
            )
            .await;
            send_text(&mut socket, "turn.end", &request_id, "{}").await;
        }
        Script::AbortMidTurn => {
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: 1011,
                    reason: "synthesis backend unavailable".into(),
                })))
                .await;
        }
        Script::VanishAfterStart => {}
    }
}

async fn send_text(socket: &mut WebSocket, path: &str, request_id: &str, body: &str) {
    let frame = format!(
        "Path: {}\r\nX-RequestId: {}\r\nContent-Type: application/json\r\n\r\n{}",
        path, request_id, body
    );
    let _ = socket.send(Message::Text(frame.into())).await;
}

async fn send_audio(socket: &mut WebSocket, request_id: &str, chunk: &[u8]) {
    let headers = format!(
        "Path: audio\r\nX-RequestId: {}\r\nContent-Type: audio/mpeg",
        request_id
    );
    let mut frame = Vec::with_capacity(2 + headers.len() + chunk.len());
    frame.extend_from_slice(&(headers.len() as u16).to_be_bytes());
    frame.extend_from_slice(headers.as_bytes());
    frame.extend_from_slice(chunk);
    let _ = socket.send(Message::Binary(frame.into())).await;
}

fn header(frame: &str, name: &str) -> Option<String> {
    frame.split("\r\n\r\n").next()?.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

/// Spawns a synthesizer that accepts the request frames and then goes
/// silent. The returned receiver resolves once the fake sees the client's
/// close frame, and errors if the connection dies without one.
async fn spawn_stalling_synthesizer() -> (String, tokio::sync::oneshot::Receiver<()>) {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = std::sync::Arc::new(std::sync::Mutex::new(Some(tx)));
    let app = Router::new().route(
        "/synth",
        get(move |upgrade: WebSocketUpgrade| {
            let tx = tx.clone();
            async move {
                upgrade.on_upgrade(move |mut socket| async move {
                    loop {
                        match socket.recv().await {
                            Some(Ok(Message::Close(_))) => {
                                if let Some(tx) = tx.lock().unwrap().take() {
                                    let _ = tx.send(());
                                }
                                return;
                            }
                            Some(Ok(_)) => {}
                            _ => {
                                // Connection died without a close handshake;
                                // dropping the sender reports that.
                                let _ = tx.lock().unwrap().take();
                                return;
                            }
                        }
                    }
                })
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{}/synth", addr), rx)
}

fn speech_service(endpoint: &str) -> SpeechService {
    SpeechService::new(SpeechConfig::new(endpoint, "test-key", "en-US-TestNeural"))
}

#[tokio::test]
async fn test_synthesize_collects_audio_and_visemes() {
    let endpoint = spawn_synthesizer(Script::Complete).await;

    let result = speech_service(&endpoint)
        .synthesize("Hello there!", SpeechStyle::Cheerful)
        .await
        .unwrap();

    // Audio chunks concatenate in arrival order.
    assert_eq!(result.audio, b"ID3-first-chunk-second-chunk".to_vec());
    // Tick offsets (100 ns units) land as whole centiseconds.
    assert_eq!(
        result.visemes,
        vec![
            VisemeEvent { offset: 5, id: 19 },
            VisemeEvent { offset: 12, id: 0 },
        ]
    );
}

#[tokio::test]
async fn test_synthesize_escapes_reply_text() {
    // Markup characters in the reply must not break the session handshake.
    let endpoint = spawn_synthesizer(Script::Complete).await;

    let result = speech_service(&endpoint)
        .synthesize("Is 3 < 5 & \"true\"?", SpeechStyle::Friendly)
        .await
        .unwrap();
    assert!(!result.audio.is_empty());
}

#[tokio::test]
async fn test_synthesize_session_abort_discards_partial_output() {
    let endpoint = spawn_synthesizer(Script::AbortMidTurn).await;

    let result = speech_service(&endpoint)
        .synthesize("Hello", SpeechStyle::Sad)
        .await;
    match result {
        Err(VoiceError::SynthesisFailed(msg)) => {
            assert!(msg.contains("before turn end"), "got: {}", msg)
        }
        _ => panic!("Expected SynthesisFailed, got {:?}", result),
    }
}

#[tokio::test]
async fn test_synthesize_connection_drop_is_failure() {
    let endpoint = spawn_synthesizer(Script::VanishAfterStart).await;

    let result = speech_service(&endpoint)
        .synthesize("Hello", SpeechStyle::Sad)
        .await;
    assert!(matches!(result, Err(VoiceError::SynthesisFailed(_))));
}

#[tokio::test]
async fn test_synthesize_unreachable_endpoint() {
    // Bind a port, then drop the listener so the connection is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = speech_service(&format!("ws://{}/synth", addr))
        .synthesize("Hello", SpeechStyle::Friendly)
        .await;
    match result {
        Err(VoiceError::UpstreamUnavailable(_)) => {}
        _ => panic!("Expected UpstreamUnavailable, got {:?}", result),
    }
}

#[tokio::test]
async fn test_synthesize_timeout_closes_session() {
    let (endpoint, saw_close) = spawn_stalling_synthesizer().await;
    let service = speech_service(&endpoint);

    let turn =
        tokio::spawn(async move { service.synthesize("Hello", SpeechStyle::Hopeful).await });

    // Let the session open and the request frames flow in real time, then
    // freeze the clock so the deadline fires without the full wait.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    tokio::time::pause();

    let result = turn.await.unwrap();
    match result {
        Err(VoiceError::SynthesisFailed(msg)) => {
            assert!(msg.contains("timed out"), "got: {}", msg)
        }
        _ => panic!("Expected SynthesisFailed, got {:?}", result),
    }

    // The abandoned session is released with a close frame, not dropped.
    saw_close.await.expect("synthesizer saw no close frame");
}
