use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Reply schema violation: {0}")]
    SchemaViolation(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
