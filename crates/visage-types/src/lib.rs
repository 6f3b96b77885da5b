//! Shared types and constants for the Visage platform.
//!
//! This crate provides the foundational types used across the Visage crates:
//! the speech style enumeration the language model chooses from, the viseme
//! timeline entries reported by the synthesizer, and the styled reply schema
//! shared between the collaborator clients and the HTTP surface.
//!
//! No crate in the workspace depends on anything *except* `visage-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotional delivery styles supported by the speech synthesizer.
///
/// The language model is constrained to this set twice: the reply schema
/// sent with each generation request enumerates the lowercase names, and
/// deserialization into [`StyledReply`] re-checks membership locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechStyle {
    /// Upbeat delivery for good news and congratulations.
    Cheerful,
    /// Sorrowful delivery for condolences and disappointing news.
    Sad,
    /// Heated delivery when the user vents and wants company in it.
    Angry,
    /// Warm, even delivery; the default register for everyday talk.
    Friendly,
    /// Shaken delivery for alarming or frightening topics.
    Terrified,
    /// Cold, curt delivery when the user asks for bluntness.
    Unfriendly,
    /// Hushed delivery for secrets and asides.
    Whispering,
    /// Encouraging delivery for uncertain but promising outcomes.
    Hopeful,
    /// Raised delivery for emphatic announcements.
    Shouting,
    /// Energetic delivery for thrilling news and celebrations.
    Excited,
}

impl SpeechStyle {
    /// Every supported style, in the order presented to the language model.
    pub const ALL: [SpeechStyle; 10] = [
        Self::Cheerful,
        Self::Sad,
        Self::Angry,
        Self::Friendly,
        Self::Terrified,
        Self::Unfriendly,
        Self::Whispering,
        Self::Hopeful,
        Self::Shouting,
        Self::Excited,
    ];

    /// Returns the lowercase wire name for this style.
    ///
    /// This is the exact token used in the reply schema, in the styled
    /// reply payload, and in the synthesis markup.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cheerful => "cheerful",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Friendly => "friendly",
            Self::Terrified => "terrified",
            Self::Unfriendly => "unfriendly",
            Self::Whispering => "whispering",
            Self::Hopeful => "hopeful",
            Self::Shouting => "shouting",
            Self::Excited => "excited",
        }
    }

    /// Attempts to convert a wire name back to a `SpeechStyle`.
    ///
    /// Returns `None` if the name does not correspond to a known style.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "cheerful" => Some(Self::Cheerful),
            "sad" => Some(Self::Sad),
            "angry" => Some(Self::Angry),
            "friendly" => Some(Self::Friendly),
            "terrified" => Some(Self::Terrified),
            "unfriendly" => Some(Self::Unfriendly),
            "whispering" => Some(Self::Whispering),
            "hopeful" => Some(Self::Hopeful),
            "shouting" => Some(Self::Shouting),
            "excited" => Some(Self::Excited),
            _ => None,
        }
    }

    /// Returns the usage guideline for this style.
    ///
    /// One line per style, embedded in the instruction given to the
    /// language model so its choice matches the synthesizer's repertoire.
    pub fn guideline(self) -> &'static str {
        match self {
            Self::Cheerful => "good news, congratulations, positive outcomes",
            Self::Sad => "condolences, bad news, sympathetic moments",
            Self::Angry => "sharing the user's frustration; use sparingly",
            Self::Friendly => "ordinary conversation; the default when nothing else fits",
            Self::Terrified => "reacting to frightening or alarming topics",
            Self::Unfriendly => "cold or curt answers the user explicitly asked for",
            Self::Whispering => "secrets, asides, confidential remarks",
            Self::Hopeful => "encouragement about uncertain outcomes",
            Self::Shouting => "emphatic announcements, calling out from afar",
            Self::Excited => "thrilling news, achievements, celebrations",
        }
    }
}

impl fmt::Display for SpeechStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders the style policy block for the language-model instruction.
///
/// One `name: guideline` line per supported style, in [`SpeechStyle::ALL`]
/// order.
pub fn style_policy() -> String {
    let mut out = String::new();
    for style in SpeechStyle::ALL {
        out.push_str("- ");
        out.push_str(style.as_str());
        out.push_str(": ");
        out.push_str(style.guideline());
        out.push('\n');
    }
    out
}

mod reply;
pub use reply::StyledReply;

mod viseme;
pub use viseme::VisemeEvent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_round_trip() {
        for style in SpeechStyle::ALL {
            assert_eq!(SpeechStyle::parse(style.as_str()), Some(style));
        }
    }

    #[test]
    fn style_invalid() {
        assert_eq!(SpeechStyle::parse("sarcastic"), None);
        assert_eq!(SpeechStyle::parse("Cheerful"), None);
        assert_eq!(SpeechStyle::parse(""), None);
    }

    #[test]
    fn style_serde_uses_wire_names() {
        for style in SpeechStyle::ALL {
            let json = serde_json::to_string(&style).expect("should serialize");
            assert_eq!(json, format!("\"{}\"", style.as_str()));
            let decoded: SpeechStyle =
                serde_json::from_str(&json).expect("should deserialize");
            assert_eq!(decoded, style);
        }
    }

    #[test]
    fn style_policy_lists_every_style() {
        let policy = style_policy();
        for style in SpeechStyle::ALL {
            assert!(policy.contains(style.as_str()), "missing {}", style);
        }
        assert_eq!(policy.lines().count(), SpeechStyle::ALL.len());
    }
}
