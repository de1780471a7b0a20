//! Language tags and script-based detection.
//!
//! The relay translates between exactly two languages. Detection is a
//! binary script check: any Hangul character makes the text Korean,
//! everything else is treated as English. This is deliberately not a
//! general-purpose detector.

use serde::{Deserialize, Serialize};

/// Supported language tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// BCP-47-style language code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Korean => "ko",
            Language::English => "en",
        }
    }

    /// Human-readable name, used in gateway prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Korean => "Korean",
            Language::English => "English",
        }
    }

    /// The translation target for this source language.
    pub fn counterpart(&self) -> Language {
        match self {
            Language::Korean => Language::English,
            Language::English => Language::Korean,
        }
    }

    /// Detect the source language of a transcript.
    ///
    /// Presence of any Hangul character means Korean; otherwise English.
    pub fn detect(text: &str) -> Language {
        if text.chars().any(is_hangul) {
            Language::Korean
        } else {
            Language::English
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Whether a character belongs to one of the Hangul Unicode blocks.
///
/// Covers precomposed syllables, the conjoining jamo used by some input
/// methods, and the compatibility jamo that transcription engines
/// occasionally emit for isolated consonants.
fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'   // Hangul Syllables
        | '\u{1100}'..='\u{11FF}' // Hangul Jamo
        | '\u{3130}'..='\u{318F}' // Hangul Compatibility Jamo
        | '\u{A960}'..='\u{A97F}' // Hangul Jamo Extended-A
        | '\u{D7B0}'..='\u{D7FF}' // Hangul Jamo Extended-B
    )
}
