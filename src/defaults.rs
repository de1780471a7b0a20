//! Default configuration constants for tongyeok.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default session idle timeout in milliseconds.
///
/// After 3 seconds with no incoming fragment the current session is
/// considered finished: its identifier and accumulated text are cleared,
/// and the next fragment starts a fresh session.
pub const IDLE_TIMEOUT_MS: u64 = 3000;

/// Default interim debounce delay in milliseconds.
///
/// A not-yet-final fragment schedules a preview translation this long after
/// the last interim arrived. 500ms keeps the live feel while bounding how
/// often the translation gateway is called mid-utterance.
pub const DEBOUNCE_MS: u64 = 500;

/// Default relay bind address.
pub const BIND_ADDR: &str = "127.0.0.1:5995";

/// Default number of final translation events kept for replay.
///
/// New connections receive this many recent finals so a late subscriber
/// sees context. Interim previews are never buffered.
pub const HISTORY_CAPACITY: usize = 50;

/// Default translation gateway endpoint (OpenAI-compatible chat completions).
pub const GATEWAY_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default translation model.
pub const GATEWAY_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the gateway API key.
pub const GATEWAY_API_KEY_ENV: &str = "TONGYEOK_API_KEY";

/// Default gateway request timeout in seconds.
pub const GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Environment variable holding the publisher secret.
pub const SECRET_ENV: &str = "TONGYEOK_SECRET";

/// Per-connection outbound queue depth.
///
/// A connection whose writer falls this far behind starts dropping
/// broadcasts rather than blocking delivery to everyone else.
pub const OUTBOUND_QUEUE: usize = 64;

/// Coordinator event queue depth.
///
/// Bounds how many inbound messages and gateway completions can be in
/// flight before connection readers apply backpressure.
pub const EVENT_QUEUE: usize = 256;
