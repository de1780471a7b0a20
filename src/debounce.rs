//! Trailing debounce for interim translation triggers.
//!
//! Interim fragments arrive far faster than the translation gateway should
//! be called. Each one schedules a preview translation a fixed delay out;
//! a newer interim supersedes the pending one, so only the most recent
//! accumulated text inside the window is ever translated. A final fragment
//! cancels the pending trigger outright.

use crate::defaults;
use crate::session::SessionId;
use std::time::Duration;
use tokio::time::Instant;

/// A scheduled interim translation, not yet fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    /// Session the text was captured under. Compared against the current
    /// session id at fire time; a mismatch means the trigger is stale.
    pub session_id: SessionId,
    /// Accumulated text captured at schedule time.
    pub text: String,
    /// When the trigger fires.
    pub due: Instant,
}

/// Debounce state for interim fragments.
#[derive(Debug)]
pub struct InterimDebouncer {
    delay: Duration,
    pending: Option<Pending>,
    /// Text of the most recent trigger, for deduplication while the
    /// speaker pauses mid-sentence and the engine re-sends the same interim.
    last_scheduled: Option<String>,
}

impl InterimDebouncer {
    /// Creates a debouncer with the default delay.
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(defaults::DEBOUNCE_MS))
    }

    /// Creates a debouncer with a custom delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            last_scheduled: None,
        }
    }

    /// Schedule an interim translation for `text`, superseding any pending one.
    ///
    /// Returns `false` when `text` matches the most recent trigger and
    /// nothing was (re)scheduled.
    pub fn schedule(&mut self, session_id: SessionId, text: &str, now: Instant) -> bool {
        if self.last_scheduled.as_deref() == Some(text) {
            return false;
        }
        self.last_scheduled = Some(text.to_string());
        self.pending = Some(Pending {
            session_id,
            text: text.to_string(),
            due: now + self.delay,
        });
        true
    }

    /// When the pending trigger fires, if one exists.
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Take the pending trigger if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Pending> {
        match &self.pending {
            Some(p) if now >= p.due => self.pending.take(),
            _ => None,
        }
    }

    /// Drop the pending trigger and the dedup text.
    ///
    /// Called when a final fragment closes the session and when the session
    /// expires: the same words in a new session must translate again.
    pub fn clear(&mut self) {
        self.pending = None;
        self.last_scheduled = None;
    }
}

impl Default for InterimDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> InterimDebouncer {
        InterimDebouncer::with_delay(Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_sets_deadline() {
        let mut d = debouncer();
        let now = Instant::now();
        assert!(d.schedule(1, "hello", now));
        assert_eq!(d.due(), Some(now + Duration::from_millis(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_text_is_deduplicated() {
        let mut d = debouncer();
        let now = Instant::now();
        assert!(d.schedule(1, "hello", now));
        let fired = d.take_due(now + Duration::from_millis(500)).unwrap();
        assert_eq!(fired.text, "hello");

        // Engine re-sends the same interim while the speaker pauses
        assert!(!d.schedule(1, "hello", now + Duration::from_millis(600)));
        assert_eq!(d.due(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_interim_supersedes_pending() {
        let mut d = debouncer();
        let now = Instant::now();
        d.schedule(1, "hello", now);
        let later = now + Duration::from_millis(300);
        d.schedule(1, "hello world", later);

        // Old deadline passes without firing
        assert_eq!(d.take_due(now + Duration::from_millis(500)), None);

        let fired = d.take_due(later + Duration::from_millis(500)).unwrap();
        assert_eq!(fired.text, "hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_due_before_deadline_returns_none() {
        let mut d = debouncer();
        let now = Instant::now();
        d.schedule(1, "hello", now);
        assert_eq!(d.take_due(now + Duration::from_millis(499)), None);
        assert!(d.due().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_and_resets_dedup() {
        let mut d = debouncer();
        let now = Instant::now();
        d.schedule(1, "hello", now);
        d.clear();
        assert_eq!(d.due(), None);

        // Same text in a new session schedules again
        assert!(d.schedule(2, "hello", now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_carries_capture_session_id() {
        let mut d = debouncer();
        let now = Instant::now();
        d.schedule(7, "안녕", now);
        let fired = d.take_due(now + Duration::from_millis(500)).unwrap();
        assert_eq!(fired.session_id, 7);
    }
}
