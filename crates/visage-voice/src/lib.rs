//! Collaborator clients for the Visage platform.
//!
//! Wraps the two external services one chat round trip depends on: the
//! language model that produces a styled reply, and the speech synthesizer
//! that renders the reply to audio while reporting viseme (mouth-shape)
//! timings. Also hosts the synthesis markup builder and the framing helpers
//! for the synthesizer's WebSocket protocol.
//!
//! Each client makes exactly one attempt per call. Retry, queueing, and
//! caller-facing error shaping are the server's concern.

pub mod config;
pub mod error;
pub mod llm;
pub mod protocol;
pub mod ssml;
pub mod tts;

pub use config::{LlmConfig, SpeechConfig};
pub use error::VoiceError;
pub use llm::ReplyService;
pub use tts::{SpeechService, SynthesisResult};
