//! Transcript normalization applied before every translation gateway call.
//!
//! Transcription engines decorate speech with non-speech markers and, on
//! trailing silence, hallucinated sign-off phrases ("thanks for watching").
//! Those are artifacts of *this* system's speech input, not a translation
//! concern, so they are stripped here rather than in the gateway.

/// Non-speech markers emitted by transcription engines.
const MARKERS: [&str; 7] = [
    "[BLANK_AUDIO]",
    "[INAUDIBLE]",
    "[MUSIC]",
    "[APPLAUSE]",
    "[LAUGHTER]",
    "(BLANK_AUDIO)",
    "(inaudible)",
];

/// Sign-off phrases hallucinated on trailing silence, stripped when they
/// close an utterance. Compared lowercased, ignoring trailing punctuation.
const CLOSING_FILLERS: [&str; 7] = [
    "시청해주셔서 감사합니다",
    "시청해 주셔서 감사합니다",
    "구독과 좋아요 부탁드립니다",
    "다음 영상에서 만나요",
    "thanks for watching",
    "thank you for watching",
    "please subscribe",
];

/// Normalizes raw transcript text: marker removal, misrecognition
/// substitutions, sign-off stripping, whitespace collapsing.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    /// Replacement pairs for known misrecognitions, longest pattern first.
    substitutions: Vec<(String, String)>,
    /// Additional closing fillers beyond the built-in list (pre-lowercased).
    extra_fillers: Vec<String>,
}

impl Normalizer {
    /// Creates a normalizer with no substitutions beyond the built-in policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set misrecognition substitution pairs.
    ///
    /// Pairs are applied as plain text replacements after marker removal.
    /// Longer patterns are applied first so a short pattern never shadows
    /// a longer one containing it.
    pub fn with_substitutions(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut subs: Vec<(String, String)> = pairs
            .into_iter()
            .filter(|(from, _)| !from.is_empty())
            .collect();
        subs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self.substitutions = subs;
        self
    }

    /// Add closing filler phrases on top of the built-in list (pre-lowercased).
    pub fn with_extra_fillers(mut self, fillers: impl IntoIterator<Item = String>) -> Self {
        self.extra_fillers = fillers
            .into_iter()
            .filter(|f| !f.trim().is_empty())
            .map(|f| f.to_lowercase())
            .collect();
        self
    }

    /// Normalize a transcript for translation.
    ///
    /// Returns an empty string when nothing translatable remains, in which
    /// case the caller must skip the gateway call entirely.
    pub fn normalize(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for marker in MARKERS {
            cleaned = cleaned.replace(marker, " ");
        }

        for (from, to) in &self.substitutions {
            cleaned = cleaned.replace(from.as_str(), to);
        }

        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        self.strip_closing_fillers(&collapsed)
    }

    /// Strip sign-off filler phrases from the end of the text, repeatedly,
    /// ignoring trailing punctuation around each one.
    fn strip_closing_fillers(&self, text: &str) -> String {
        let mut out = text.trim().to_string();
        loop {
            let trimmed = out.trim_end_matches(['.', '!', '?', ',', '~']).trim_end();
            let lower = trimmed.to_lowercase();

            let matched = CLOSING_FILLERS
                .iter()
                .map(|f| f.to_lowercase())
                .chain(self.extra_fillers.iter().cloned())
                .find(|f| lower.ends_with(f.as_str()));

            match matched {
                Some(filler) => {
                    let cut = trimmed.len().saturating_sub(filler.len());
                    if !trimmed.is_char_boundary(cut) {
                        // Lowercasing changed byte lengths; leave the text alone.
                        return out;
                    }
                    out = trimmed[..cut].trim_end().to_string();
                }
                None => return out,
            }
        }
    }
}
