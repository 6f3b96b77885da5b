//! Synthesis markup construction.
//!
//! Builds the SSML document sent to the synthesizer for each utterance.
//! Construction is pure string composition; callers escape reply text with
//! [`escape_text`] before embedding it. Style validity never needs checking
//! here because [`SpeechStyle`] cannot hold an unknown value.

use visage_types::SpeechStyle;

/// Mouth-shape animation request inserted at the start of every utterance.
const VISEME_MARKER: &str = "<mstts:viseme type='redlips_front'/>";

/// Rest-pose cue appended twice after the styled span so the mouth track
/// settles back to neutral at the end of the utterance.
const VISEME_REST_MARKER: &str = "<mstts:viseme type='sil'/>";

/// Builds the markup document for one utterance. The spoken text is
/// bracketed by calibration markers: one opening marker before the styled
/// span and two rest markers after it.
pub fn build_markup(text: &str, style: SpeechStyle, voice: &str) -> String {
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' \
         xmlns:mstts='https://www.w3.org/2001/mstts' xml:lang='en-US'>\
         <voice name='{}'>{}<mstts:express-as style='{}'>{}</mstts:express-as>\
         {}{}</voice></speak>",
        voice, VISEME_MARKER, style, text, VISEME_REST_MARKER, VISEME_REST_MARKER
    )
}

/// Escapes the five XML entities so arbitrary reply text is safe to embed
/// in the markup document.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
