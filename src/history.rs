//! In-memory ring buffer of recent final translation events.
//!
//! Replayed to newly connected clients so a late subscriber sees recent
//! context. This is the only persistence the relay has; interim previews
//! are never buffered.

use crate::defaults;
use crate::relay::protocol::TranslationEvent;
use std::collections::VecDeque;

/// Capped buffer of final translation events, oldest first.
#[derive(Debug)]
pub struct TranslationHistory {
    capacity: usize,
    events: VecDeque<TranslationEvent>,
}

impl TranslationHistory {
    /// Creates a history buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(defaults::HISTORY_CAPACITY)
    }

    /// Creates a history buffer holding at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a final event, evicting the oldest when full.
    ///
    /// Interim events are ignored.
    pub fn push(&mut self, event: TranslationEvent) {
        if !event.is_final || self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Buffered events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TranslationEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for TranslationHistory {
    fn default() -> Self {
        Self::new()
    }
}
