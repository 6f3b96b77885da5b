use crate::error::VoiceError;
use std::fmt;

/// Default chat-completions endpoint.
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model identifier sent with each generation request.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the language-model collaborator.
///
/// The credential is environment-sourced and never written to config files.
#[derive(Clone)]
pub struct LlmConfig {
    /// Full chat-completions URL. Tests point this at a local fake.
    pub endpoint: String,
    pub api_key: String,
    /// Model identifier sent with each request.
    pub model: String,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl LlmConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Builds the config from the environment.
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_ENDPOINT` and `OPENAI_MODEL`
    /// override the defaults when set.
    pub fn from_env() -> Result<Self, VoiceError> {
        let api_key = require_env("OPENAI_API_KEY")?;
        let endpoint =
            optional_env("OPENAI_ENDPOINT").unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string());
        let model = optional_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
        Ok(Self::new(endpoint, api_key, model))
    }
}

/// Connection settings for the speech-synthesis collaborator.
///
/// The credential is environment-sourced and never written to config files.
#[derive(Clone)]
pub struct SpeechConfig {
    /// WebSocket endpoint of the synthesis service. Derived from the region
    /// unless overridden; tests point this at a local fake.
    pub endpoint: String,
    pub api_key: String,
    /// Neural voice name used for every utterance.
    pub voice: String,
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("voice", &self.voice)
            .finish()
    }
}

impl SpeechConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            voice: voice.into(),
        }
    }

    /// Builds the config for a hosted region.
    pub fn for_region(
        region: &str,
        api_key: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        let endpoint = format!(
            "wss://{}.tts.speech.microsoft.com/cognitiveservices/websocket/v1",
            region
        );
        Self::new(endpoint, api_key, voice)
    }

    /// Builds the config from the environment.
    ///
    /// `SPEECH_KEY`, `SPEECH_REGION`, and `SPEECH_VOICE` are required;
    /// `SPEECH_ENDPOINT` overrides the region-derived endpoint when set.
    pub fn from_env() -> Result<Self, VoiceError> {
        let api_key = require_env("SPEECH_KEY")?;
        let region = require_env("SPEECH_REGION")?;
        let voice = require_env("SPEECH_VOICE")?;
        let mut config = Self::for_region(&region, api_key, voice);
        if let Some(endpoint) = optional_env("SPEECH_ENDPOINT") {
            config.endpoint = endpoint;
        }
        Ok(config)
    }
}

fn require_env(name: &str) -> Result<String, VoiceError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(VoiceError::Config(format!("{} must be set", name))),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
