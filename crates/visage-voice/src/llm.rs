use crate::config::LlmConfig;
use crate::error::VoiceError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use visage_types::{style_policy, SpeechStyle, StyledReply};

/// Timeout for one chat-completions round trip.
const LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the language-model collaborator.
///
/// Sends one chat-completions request per call, asks the provider to
/// enforce the styled-reply schema, and re-validates the payload locally
/// before handing it back.
#[derive(Debug, Clone)]
pub struct ReplyService {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ReplyService {
    pub fn new(config: LlmConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Generates one styled reply for the user message.
    ///
    /// Single attempt: transport errors and non-success provider statuses
    /// surface as `UpstreamUnavailable`, payloads that do not match the
    /// reply schema as `SchemaViolation`.
    pub async fn generate(&self, message: &str) -> Result<StyledReply, VoiceError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_instruction() },
                { "role": "user", "content": message },
            ],
            "response_format": reply_schema(),
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                VoiceError::UpstreamUnavailable(format!("language model request failed: {}", e))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            VoiceError::UpstreamUnavailable(format!("language model response read failed: {}", e))
        })?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "language model returned error status");
            return Err(VoiceError::UpstreamUnavailable(format!(
                "language model returned {}",
                status
            )));
        }

        let completion: ChatCompletion = serde_json::from_str(&text).map_err(|e| {
            VoiceError::SchemaViolation(format!("malformed completion envelope: {}", e))
        })?;

        let content = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| {
                VoiceError::SchemaViolation("completion has no message content".to_string())
            })?;

        parse_reply(content)
    }
}

/// System instruction carrying the style policy.
fn system_instruction() -> String {
    format!(
        "You are the voice of a virtual avatar. Answer the user's message \
         conversationally in one to three sentences. Choose exactly one \
         speaking style for the answer from the list below and justify the \
         choice in one short sentence.\n\nSpeaking styles:\n{}",
        style_policy()
    )
}

/// Strict output schema for the provider: exactly the three reply fields,
/// style constrained to the supported set, no additional properties.
fn reply_schema() -> serde_json::Value {
    let styles: Vec<&str> = SpeechStyle::ALL.iter().map(|s| s.as_str()).collect();
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "styled_reply",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "response": {
                        "type": "string",
                        "description": "The reply to speak to the user."
                    },
                    "style": {
                        "type": "string",
                        "enum": styles
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "One sentence on why the style fits."
                    }
                },
                "required": ["response", "style", "reasoning"],
                "additionalProperties": false
            }
        }
    })
}

/// Re-validates the provider's payload against the reply schema.
///
/// Membership and field checks are repeated locally rather than trusting
/// the provider's schema enforcement.
fn parse_reply(content: &str) -> Result<StyledReply, VoiceError> {
    let reply: StyledReply = serde_json::from_str(content)
        .map_err(|e| VoiceError::SchemaViolation(format!("reply does not match schema: {}", e)))?;
    if reply.text.trim().is_empty() {
        return Err(VoiceError::SchemaViolation("reply text is empty".to_string()));
    }
    Ok(reply)
}
