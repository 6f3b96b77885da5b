//! Viseme timeline entries reported during speech synthesis.

use serde::{Deserialize, Serialize};

/// One mouth-shape cue within a synthesized utterance.
///
/// `offset` counts centiseconds from the start of the audio. `id` is the
/// synthesizer's mouth-shape code (0 through 21, where 0 is the closed
/// mouth at silence). Cues arrive in chronological order and are kept in
/// arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisemeEvent {
    /// Offset from the start of the audio, in centiseconds.
    pub offset: u64,
    /// Mouth-shape identifier.
    pub id: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let event = VisemeEvent { offset: 5, id: 19 };
        let json = serde_json::to_string(&event).expect("should serialize");
        assert_eq!(json, r#"{"offset":5,"id":19}"#);
    }

    #[test]
    fn serialization_round_trip() {
        let event = VisemeEvent { offset: 120, id: 0 };
        let json = serde_json::to_string(&event).expect("should serialize");
        let decoded: VisemeEvent = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(decoded, event);
    }
}
