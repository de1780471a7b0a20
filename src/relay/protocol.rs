//! JSON message protocol between relay server and clients.
//!
//! Messages travel as one JSON object per line. Every connection starts as
//! a subscriber; a successful `authenticate` promotes it to publisher.

use crate::lang::Language;
use serde::{Deserialize, Serialize};

/// Messages sent by clients to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A transcript fragment from the publisher.
    Fragment { text: String, is_final: bool },
    /// Claim the publisher role with the shared secret.
    Authenticate { secret: String },
    /// Give up the publisher role, abandoning any unfinished utterance.
    Release,
}

impl ClientMessage {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Messages sent by the relay to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Publisher role granted.
    AuthSuccess,
    /// Wrong secret; role unchanged.
    AuthFailed,
    /// A translation, broadcast to every connection.
    Translation { event: TranslationEvent },
    /// Number of subscriber-role connections, broadcast on every change.
    SubscriberCount { count: usize },
    /// Request-scoped failure, sent only to the offending connection.
    Error { reason: String },
}

impl ServerMessage {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// The broadcast unit: one translation of the accumulated session text.
///
/// For a given `session_id`, an event with `is_final = true` is the last
/// one emitted; later fragments belong to a new session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationEvent {
    /// Owning session, formatted as `s{n}`.
    pub session_id: String,
    /// Normalized source text the translation was produced from.
    pub source_text: String,
    /// Translated text.
    pub translated_text: String,
    /// Detected source language.
    pub source_lang: Language,
    /// Target language.
    pub target_lang: Language,
    /// Whether the owning utterance is complete.
    pub is_final: bool,
    /// Server wall-clock timestamp, unix milliseconds.
    pub timestamp_ms: u64,
}
