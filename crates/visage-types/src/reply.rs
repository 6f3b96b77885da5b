//! The styled reply contract for the language-model collaborator.

use crate::SpeechStyle;
use serde::{Deserialize, Serialize};

/// A generated reply together with its delivery instructions.
///
/// Deserialization is strict: all three fields must be present, `style` must
/// name a member of [`SpeechStyle`], and unknown fields are rejected. The
/// provider is asked to enforce this schema on its side, but its output is
/// re-validated here rather than trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StyledReply {
    /// The text to speak to the user.
    #[serde(rename = "response")]
    pub text: String,
    /// Delivery style for the synthesizer.
    pub style: SpeechStyle,
    /// One-sentence justification for the chosen style.
    #[serde(rename = "reasoning")]
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_reply_parses() {
        let reply: StyledReply = serde_json::from_str(
            r#"{"response":"Congratulations!","style":"cheerful","reasoning":"Good news deserves an upbeat tone."}"#,
        )
        .expect("should deserialize");
        assert_eq!(reply.text, "Congratulations!");
        assert_eq!(reply.style, SpeechStyle::Cheerful);
        assert_eq!(reply.rationale, "Good news deserves an upbeat tone.");
    }

    #[test]
    fn unknown_style_rejected() {
        let result = serde_json::from_str::<StyledReply>(
            r#"{"response":"hi","style":"sarcastic","reasoning":"because"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_field_rejected() {
        let result =
            serde_json::from_str::<StyledReply>(r#"{"response":"hi","style":"friendly"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn extra_field_rejected() {
        let result = serde_json::from_str::<StyledReply>(
            r#"{"response":"hi","style":"friendly","reasoning":"because","confidence":0.9}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn wire_field_names() {
        let reply = StyledReply {
            text: "hi".to_string(),
            style: SpeechStyle::Friendly,
            rationale: "plain chat".to_string(),
        };
        let json = serde_json::to_string(&reply).expect("should serialize");
        assert_eq!(
            json,
            r#"{"response":"hi","style":"friendly","reasoning":"plain chat"}"#
        );
    }
}
