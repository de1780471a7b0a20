//! tongyeok - Live Korean-English speech translation relay
//!
//! One authenticated publisher streams transcript fragments; the relay
//! accumulates them into utterance sessions, translates via an external
//! language model, and broadcasts the result to every subscriber.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod cli;
pub mod config;
pub mod debounce;
pub mod defaults;
pub mod error;
pub mod history;
pub mod lang;
pub mod normalize;
pub mod relay;
pub mod session;
pub mod translate;

// Coordination core
pub use debounce::InterimDebouncer;
pub use history::TranslationHistory;
pub use session::{Absorbed, SessionAccumulator, SessionId};

// Relay networking
pub use relay::{ClientMessage, Coordinator, Event, RelayClient, ServerMessage, TranslationEvent};

// Translation boundary
pub use translate::{LlmGateway, MockGateway, TranslationGateway, TranslationResult};

// Error handling
pub use error::{RelayError, Result};

// Config
pub use config::Config;
pub use lang::Language;
pub use normalize::Normalizer;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
