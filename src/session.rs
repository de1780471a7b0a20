//! Session accumulation for one continuous utterance.
//!
//! Fragments from the publisher are merged into a session bounded by
//! inactivity. Interim fragments are evolving snapshots of the utterance
//! in progress: each one supersedes the previous, merged against the
//! committed text for preview translation without being persisted. A final
//! fragment joins the committed text for good and closes the utterance.
//! The accumulator is plain state; the coordinator's event loop owns the
//! actual timer and calls back in here.

use crate::defaults;
use std::time::Duration;
use tokio::time::Instant;

/// Identifier of one accumulation session.
///
/// Monotonic per process; the single-publisher model means ids only need
/// to distinguish successive utterances for subscribers.
pub type SessionId = u64;

/// One in-progress utterance.
#[derive(Debug, Clone)]
struct ActiveSession {
    id: SessionId,
    /// Space-joined text of the final fragments absorbed so far.
    committed: String,
    last_activity: Instant,
}

/// Snapshot returned for each absorbed fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Absorbed {
    /// Session the fragment was merged into.
    pub session_id: SessionId,
    /// Full session text after the merge: committed text joined with the
    /// fragment. For interim fragments this is a preview only; nothing is
    /// persisted until a final arrives.
    pub text: String,
}

/// Merges transcript fragments into sessions bounded by inactivity.
#[derive(Debug)]
pub struct SessionAccumulator {
    idle_timeout: Duration,
    next_id: SessionId,
    current: Option<ActiveSession>,
}

impl SessionAccumulator {
    /// Creates an accumulator with the default idle timeout.
    pub fn new() -> Self {
        Self::with_idle_timeout(Duration::from_millis(defaults::IDLE_TIMEOUT_MS))
    }

    /// Creates an accumulator with a custom idle timeout.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            next_id: 1,
            current: None,
        }
    }

    /// Merge a fragment into the current session, creating one if needed.
    ///
    /// Whitespace-only input is a no-op: it neither creates nor extends a
    /// session, and it does not rearm the idle timer.
    ///
    /// # Arguments
    /// * `text` - Raw fragment text
    /// * `is_final` - Whether the utterance is complete; only then is the
    ///   merged text committed to the session
    /// * `now` - Arrival time, rearms the idle timer
    ///
    /// # Returns
    /// The session id and merged session text, or `None` for empty input.
    pub fn absorb(&mut self, text: &str, is_final: bool, now: Instant) -> Option<Absorbed> {
        let fragment = text.trim();
        if fragment.is_empty() {
            return None;
        }

        let session = match self.current.as_mut() {
            Some(session) => {
                session.last_activity = now;
                session
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.current.insert(ActiveSession {
                    id,
                    committed: String::new(),
                    last_activity: now,
                })
            }
        };

        let merged = if session.committed.is_empty() {
            fragment.to_string()
        } else {
            format!("{} {}", session.committed, fragment)
        };

        if is_final {
            session.committed = merged.clone();
        }

        Some(Absorbed {
            session_id: session.id,
            text: merged,
        })
    }

    /// Close the current session immediately.
    ///
    /// Called after a final fragment produced its merged text, and on
    /// publisher release. The next fragment starts a fresh session id.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Id of the active session, if any.
    ///
    /// Used to validate delayed timers and in-flight gateway completions:
    /// results captured under an id that no longer matches are stale.
    pub fn current_id(&self) -> Option<SessionId> {
        self.current.as_ref().map(|s| s.id)
    }

    /// When the current session expires if no further fragment arrives.
    pub fn idle_deadline(&self) -> Option<Instant> {
        self.current
            .as_ref()
            .map(|s| s.last_activity + self.idle_timeout)
    }

    /// Clear the session if its idle deadline has passed.
    ///
    /// Returns the expired session id, or `None` if still active.
    pub fn expire_idle(&mut self, now: Instant) -> Option<SessionId> {
        match self.idle_deadline() {
            Some(deadline) if now >= deadline => self.current.take().map(|s| s.id),
            _ => None,
        }
    }
}

impl Default for SessionAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator() -> SessionAccumulator {
        SessionAccumulator::with_idle_timeout(Duration::from_millis(3000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fragment_creates_session() {
        let mut acc = accumulator();
        let absorbed = acc.absorb("hello", false, Instant::now()).unwrap();
        assert_eq!(absorbed.text, "hello");
        assert_eq!(acc.current_id(), Some(absorbed.session_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interim_snapshots_supersede_each_other() {
        let mut acc = accumulator();
        let now = Instant::now();
        let first = acc.absorb("안녕", false, now).unwrap();
        let second = acc.absorb("안녕 하세요", false, now).unwrap();

        // Same session, but the newer snapshot replaces the older one
        assert_eq!(first.session_id, second.session_id);
        assert_eq!(second.text, "안녕 하세요");
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_text_replaces_interim_snapshots() {
        let mut acc = accumulator();
        let now = Instant::now();
        acc.absorb("안녕", false, now).unwrap();
        acc.absorb("안녕 하세요", false, now).unwrap();
        let fin = acc.absorb("안녕하세요", true, now).unwrap();
        assert_eq!(fin.text, "안녕하세요");
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_fragments_are_space_joined() {
        let mut acc = accumulator();
        let now = Instant::now();
        acc.absorb("hello", true, now).unwrap();
        let second = acc.absorb("world", true, now).unwrap();
        assert_eq!(second.text, "hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interim_merges_against_committed_text() {
        let mut acc = accumulator();
        let now = Instant::now();
        acc.absorb("first part", true, now).unwrap();
        let preview = acc.absorb("and more", false, now).unwrap();
        assert_eq!(preview.text, "first part and more");

        // The interim preview was not persisted
        let fin = acc.absorb("the rest", true, now).unwrap();
        assert_eq!(fin.text, "first part the rest");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragment_text_is_trimmed() {
        let mut acc = accumulator();
        let now = Instant::now();
        let absorbed = acc.absorb("  안녕  ", false, now).unwrap();
        assert_eq!(absorbed.text, "안녕");
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_only_is_a_no_op() {
        let mut acc = accumulator();
        let now = Instant::now();
        assert!(acc.absorb("", false, now).is_none());
        assert!(acc.absorb("   ", true, now).is_none());
        assert_eq!(acc.current_id(), None);
        assert_eq!(acc.idle_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_does_not_rearm_idle_timer() {
        let mut acc = accumulator();
        let now = Instant::now();
        acc.absorb("hello", false, now).unwrap();
        let deadline = acc.idle_deadline().unwrap();

        assert!(acc
            .absorb("  ", false, now + Duration::from_millis(1000))
            .is_none());
        assert_eq!(acc.idle_deadline().unwrap(), deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_deadline_rearmed_on_every_fragment() {
        let mut acc = accumulator();
        let now = Instant::now();
        acc.absorb("hello", false, now).unwrap();
        let first = acc.idle_deadline().unwrap();

        let later = now + Duration::from_millis(1000);
        acc.absorb("again", false, later).unwrap();
        let second = acc.idle_deadline().unwrap();
        assert_eq!(second, later + Duration::from_millis(3000));
        assert!(second > first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_session_and_next_fragment_gets_new_id() {
        let mut acc = accumulator();
        let now = Instant::now();
        let first = acc.absorb("hello", true, now).unwrap();
        acc.reset();
        assert_eq!(acc.current_id(), None);

        let second = acc.absorb("world", false, now).unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(second.text, "world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_idle_clears_after_timeout() {
        let mut acc = accumulator();
        let now = Instant::now();
        let absorbed = acc.absorb("hello", false, now).unwrap();

        // Not yet expired
        assert_eq!(acc.expire_idle(now + Duration::from_millis(2999)), None);
        assert_eq!(acc.current_id(), Some(absorbed.session_id));

        // Expired: old text is gone, next fragment starts fresh
        assert_eq!(
            acc.expire_idle(now + Duration::from_millis(3000)),
            Some(absorbed.session_id)
        );
        let fresh = acc
            .absorb("world", false, now + Duration::from_millis(4000))
            .unwrap();
        assert_eq!(fresh.text, "world");
        assert_ne!(fresh.session_id, absorbed.session_id);
    }
}
