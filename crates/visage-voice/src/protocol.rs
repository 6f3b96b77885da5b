//! Wire framing for the synthesizer's WebSocket protocol.
//!
//! Client messages are text frames of the form:
//!
//! ```text
//! Path: <path>\r\n
//! X-RequestId: <id>\r\n
//! X-Timestamp: <iso-8601>\r\n
//! Content-Type: <mime>\r\n
//! \r\n
//! <body>
//! ```
//!
//! The service answers with text frames in the same layout (`turn.start`,
//! `audio.metadata`, `turn.end`) and with binary frames carrying a
//! big-endian `u16` header-section length, the ASCII header section, and
//! then raw audio bytes.

use crate::error::VoiceError;
use serde::Deserialize;
use visage_types::VisemeEvent;

/// Viseme offsets arrive in 100-nanosecond ticks; one centisecond is
/// 100 000 ticks. Conversion truncates toward zero.
pub const TICKS_PER_CENTISECOND: u64 = 100_000;

/// Fixed output encoding: mono, 48 kHz, 192 kbit/s MP3.
pub const OUTPUT_FORMAT: &str = "audio-48khz-192kbitrate-mono-mp3";

/// Message paths exchanged during one synthesis turn.
pub mod path {
    pub const SPEECH_CONFIG: &str = "speech.config";
    pub const SYNTHESIS_CONTEXT: &str = "synthesis.context";
    pub const SSML: &str = "ssml";
    pub const TURN_START: &str = "turn.start";
    pub const TURN_END: &str = "turn.end";
    pub const AUDIO: &str = "audio";
    pub const AUDIO_METADATA: &str = "audio.metadata";
}

/// Renders one client text frame.
pub fn text_frame(path: &str, request_id: &str, content_type: &str, body: &str) -> String {
    format!(
        "Path: {}\r\nX-RequestId: {}\r\nX-Timestamp: {}\r\nContent-Type: {}\r\n\r\n{}",
        path,
        request_id,
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        content_type,
        body
    )
}

/// A parsed service frame: its `Path` header plus the payload.
#[derive(Debug)]
pub struct ServiceFrame<T> {
    pub path: String,
    pub payload: T,
}

/// Splits a service text frame into its `Path` header and body.
pub fn parse_text_frame(frame: &str) -> Result<ServiceFrame<String>, VoiceError> {
    let (headers, body) = frame.split_once("\r\n\r\n").ok_or_else(|| {
        VoiceError::SynthesisFailed("text frame missing header separator".to_string())
    })?;
    let path = header_value(headers, "Path").ok_or_else(|| {
        VoiceError::SynthesisFailed("text frame missing Path header".to_string())
    })?;
    Ok(ServiceFrame {
        path,
        payload: body.to_string(),
    })
}

/// Splits a service binary frame into its `Path` header and audio payload.
pub fn parse_binary_frame(frame: &[u8]) -> Result<ServiceFrame<Vec<u8>>, VoiceError> {
    if frame.len() < 2 {
        return Err(VoiceError::SynthesisFailed(
            "binary frame shorter than header length prefix".to_string(),
        ));
    }
    let header_len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    if frame.len() < 2 + header_len {
        return Err(VoiceError::SynthesisFailed(format!(
            "binary frame truncated: header section claims {} bytes, {} available",
            header_len,
            frame.len() - 2
        )));
    }
    let headers = std::str::from_utf8(&frame[2..2 + header_len]).map_err(|_| {
        VoiceError::SynthesisFailed("binary frame header section is not UTF-8".to_string())
    })?;
    let path = header_value(headers, "Path").ok_or_else(|| {
        VoiceError::SynthesisFailed("binary frame missing Path header".to_string())
    })?;
    Ok(ServiceFrame {
        path,
        payload: frame[2 + header_len..].to_vec(),
    })
}

fn header_value(headers: &str, name: &str) -> Option<String> {
    for line in headers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// Body of an `audio.metadata` frame: a list of typed entries. Viseme
/// entries carry the tick offset and mouth-shape id.
#[derive(Debug, Deserialize)]
struct MetadataPayload {
    #[serde(rename = "Metadata", default)]
    entries: Vec<MetadataEntry>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Data", default)]
    data: Option<MetadataData>,
}

#[derive(Debug, Deserialize)]
struct MetadataData {
    #[serde(rename = "Offset", default)]
    offset_ticks: u64,
    #[serde(rename = "VisemeId")]
    viseme_id: Option<u8>,
}

/// Extracts viseme events from an `audio.metadata` body, converting tick
/// offsets to whole centiseconds. Entries of other metadata types are
/// ignored.
pub fn parse_viseme_events(body: &str) -> Result<Vec<VisemeEvent>, VoiceError> {
    let payload: MetadataPayload = serde_json::from_str(body)
        .map_err(|e| VoiceError::SynthesisFailed(format!("malformed audio metadata: {}", e)))?;
    let mut events = Vec::new();
    for entry in payload.entries {
        if entry.kind != "Viseme" {
            continue;
        }
        let Some(data) = entry.data else { continue };
        let Some(id) = data.viseme_id else { continue };
        events.push(VisemeEvent {
            offset: data.offset_ticks / TICKS_PER_CENTISECOND,
            id,
        });
    }
    Ok(events)
}

/// Body of the `speech.config` message sent once per session.
pub fn speech_config() -> String {
    serde_json::json!({
        "context": {
            "system": {
                "name": "visage",
                "version": env!("CARGO_PKG_VERSION")
            }
        }
    })
    .to_string()
}

/// Body of the `synthesis.context` message: viseme reporting on, word and
/// sentence boundaries off, fixed output format.
pub fn synthesis_context() -> String {
    serde_json::json!({
        "synthesis": {
            "audio": {
                "metadataOptions": {
                    "visemeEnabled": true,
                    "sentenceBoundaryEnabled": false,
                    "wordBoundaryEnabled": false
                },
                "outputFormat": OUTPUT_FORMAT
            }
        }
    })
    .to_string()
}
