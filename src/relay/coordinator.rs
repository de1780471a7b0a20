//! Coordination core of the relay.
//!
//! One task owns every piece of mutable state: the session accumulator,
//! the interim debouncer, the connection registry, and the history buffer.
//! Connection readers and gateway completions talk to it exclusively
//! through the event channel, so no locks are needed; the only suspension
//! points are the timers and the translation gateway call.

use crate::config::Config;
use crate::debounce::InterimDebouncer;
use crate::defaults;
use crate::error::RelayError;
use crate::history::TranslationHistory;
use crate::lang::Language;
use crate::normalize::Normalizer;
use crate::relay::protocol::{ClientMessage, ServerMessage, TranslationEvent};
use crate::relay::registry::{AuthOutcome, ConnId, ConnectionRegistry};
use crate::session::{Absorbed, SessionAccumulator, SessionId};
use crate::translate::{TranslationGateway, TranslationResult};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Everything that can happen to the coordinator.
#[derive(Debug)]
pub enum Event {
    /// A connection finished its handshake with the server.
    Connected {
        conn: ConnId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// A connection's transport closed.
    Disconnected { conn: ConnId },
    /// A parsed inbound message.
    Inbound { conn: ConnId, message: ClientMessage },
    /// An inbound line that failed to parse.
    Malformed { conn: ConnId, detail: String },
    /// A spawned interim gateway call completed.
    InterimTranslated {
        session_id: SessionId,
        result: TranslationResult,
    },
}

/// Single-owner event loop coordinating sessions, timers, translation
/// calls, and broadcast.
pub struct Coordinator {
    secret: Option<String>,
    session: SessionAccumulator,
    debounce: InterimDebouncer,
    registry: ConnectionRegistry,
    history: TranslationHistory,
    normalizer: Normalizer,
    gateway: Arc<dyn TranslationGateway>,
    events_rx: mpsc::Receiver<Event>,
    /// Cloned into spawned gateway tasks so completions come back as events.
    events_tx: mpsc::Sender<Event>,
}

impl Coordinator {
    /// Build a coordinator from configuration.
    ///
    /// Returns the coordinator and the event sender the server side feeds.
    pub fn new(config: &Config, gateway: Arc<dyn TranslationGateway>) -> (Self, mpsc::Sender<Event>) {
        let (events_tx, events_rx) = mpsc::channel(defaults::EVENT_QUEUE);

        let secret = config.auth.resolve_secret();
        if secret.is_none() {
            tracing::warn!("no publisher secret configured; every authenticate will be rejected");
        }

        let normalizer = Normalizer::new()
            .with_substitutions(config.normalize.substitutions.clone())
            .with_extra_fillers(config.normalize.extra_fillers.clone());

        let coordinator = Self {
            secret,
            session: SessionAccumulator::with_idle_timeout(Duration::from_millis(
                config.session.idle_timeout_ms,
            )),
            debounce: InterimDebouncer::with_delay(Duration::from_millis(
                config.session.debounce_ms,
            )),
            registry: ConnectionRegistry::new(),
            history: TranslationHistory::with_capacity(config.history.capacity),
            normalizer,
            gateway,
            events_rx,
            events_tx: events_tx.clone(),
        };

        (coordinator, events_tx)
    }

    /// Run until every event sender is dropped.
    pub async fn run(mut self) {
        loop {
            let idle_at = self.session.idle_deadline();
            let debounce_at = self.debounce.due();

            tokio::select! {
                // Deterministic order: queued events, then the debounce
                // deadline, then idle expiry. An overdue preview fires
                // before a simultaneous session expiry can cancel it.
                biased;

                event = self.events_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(debounce_at.unwrap_or_else(Instant::now)),
                    if debounce_at.is_some() =>
                {
                    self.fire_interim();
                }
                _ = tokio::time::sleep_until(idle_at.unwrap_or_else(Instant::now)),
                    if idle_at.is_some() =>
                {
                    self.expire_session();
                }
            }
        }
        tracing::debug!("coordinator stopped");
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected { conn, sender } => self.on_connected(conn, sender),
            Event::Disconnected { conn } => self.on_disconnected(conn),
            Event::Inbound { conn, message } => self.on_message(conn, message).await,
            Event::Malformed { conn, detail } => {
                self.registry.send_to(
                    conn,
                    ServerMessage::Error {
                        reason: RelayError::MalformedMessage { message: detail }.to_string(),
                    },
                );
            }
            Event::InterimTranslated { session_id, result } => {
                self.apply_interim(session_id, result);
            }
        }
    }

    fn on_connected(&mut self, conn: ConnId, sender: mpsc::Sender<ServerMessage>) {
        self.registry.register(conn, sender);
        tracing::info!(conn, total = self.registry.len(), "connection registered");

        // Replay recent finals so a late subscriber sees context
        for event in self.history.iter() {
            self.registry.send_to(
                conn,
                ServerMessage::Translation {
                    event: event.clone(),
                },
            );
        }
        self.broadcast_count();
    }

    fn on_disconnected(&mut self, conn: ConnId) {
        // The session outlives the publisher connection; only its idle
        // timeout resets it.
        self.registry.unregister(conn);
        tracing::info!(conn, total = self.registry.len(), "connection removed");
        self.broadcast_count();
    }

    async fn on_message(&mut self, conn: ConnId, message: ClientMessage) {
        match message {
            ClientMessage::Authenticate { secret } => self.on_authenticate(conn, &secret),
            ClientMessage::Release => self.on_release(conn),
            ClientMessage::Fragment { text, is_final } => {
                self.on_fragment(conn, &text, is_final).await;
            }
        }
    }

    fn on_authenticate(&mut self, conn: ConnId, supplied: &str) {
        match self
            .registry
            .authenticate(conn, supplied, self.secret.as_deref())
        {
            AuthOutcome::Granted => {
                tracing::info!(conn, "publisher authenticated");
                self.registry.send_to(conn, ServerMessage::AuthSuccess);
                self.broadcast_count();
            }
            AuthOutcome::Rejected => {
                tracing::warn!(conn, "authentication rejected");
                self.registry.send_to(conn, ServerMessage::AuthFailed);
            }
        }
    }

    fn on_release(&mut self, conn: ConnId) {
        if !self.registry.release(conn) {
            return;
        }
        // Abandon the unfinished utterance without emitting a final event
        self.debounce.clear();
        self.session.reset();
        tracing::info!(conn, "publisher released role");
        self.broadcast_count();
    }

    async fn on_fragment(&mut self, conn: ConnId, text: &str, is_final: bool) {
        if !self.registry.is_publisher(conn) {
            self.registry.send_to(
                conn,
                ServerMessage::Error {
                    reason: RelayError::NotPublisher.to_string(),
                },
            );
            return;
        }

        let now = Instant::now();
        let Some(absorbed) = self.session.absorb(text, is_final, now) else {
            // Whitespace-only fragments neither extend the session nor
            // trigger translation
            return;
        };

        if is_final {
            self.finalize(conn, absorbed).await;
        } else {
            self.debounce.schedule(absorbed.session_id, &absorbed.text, now);
        }
    }

    /// Final path: cancel the pending interim, close the session, translate
    /// the full accumulated text, broadcast.
    async fn finalize(&mut self, conn: ConnId, absorbed: Absorbed) {
        self.debounce.clear();
        self.session.reset();

        let normalized = self.normalizer.normalize(&absorbed.text);
        if normalized.is_empty() {
            return;
        }
        let source = Language::detect(&normalized);

        match self
            .gateway
            .translate(&normalized, source, source.counterpart())
            .await
        {
            Ok(result) => {
                let event = self.make_event(absorbed.session_id, result, true);
                self.history.push(event.clone());
                self.registry
                    .broadcast(&ServerMessage::Translation { event });
            }
            Err(e) => {
                tracing::error!(session = absorbed.session_id, "final translation failed: {e}");
                self.registry.send_to(
                    conn,
                    ServerMessage::Error {
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    /// The debounce deadline passed: translate the captured interim text in
    /// a spawned task so new fragments keep flowing meanwhile.
    fn fire_interim(&mut self) {
        let now = Instant::now();
        let Some(pending) = self.debounce.take_due(now) else {
            return;
        };
        // Timer armed under an older session: ignore, never act on it
        if self.session.current_id() != Some(pending.session_id) {
            tracing::debug!(session = pending.session_id, "ignoring superseded interim timer");
            return;
        }

        let normalized = self.normalizer.normalize(&pending.text);
        if normalized.is_empty() {
            return;
        }
        let source = Language::detect(&normalized);

        let gateway = Arc::clone(&self.gateway);
        let events = self.events_tx.clone();
        let session_id = pending.session_id;
        tokio::spawn(async move {
            match gateway
                .translate(&normalized, source, source.counterpart())
                .await
            {
                Ok(result) => {
                    let _ = events
                        .send(Event::InterimTranslated { session_id, result })
                        .await;
                }
                Err(e) => {
                    // No synchronous waiter on the interim path: log and drop
                    tracing::warn!(session = session_id, "interim translation dropped: {e}");
                }
            }
        });
    }

    /// An interim gateway call came back; broadcast it unless the session
    /// moved on while the call was in flight.
    fn apply_interim(&mut self, session_id: SessionId, result: TranslationResult) {
        if self.session.current_id() != Some(session_id) {
            tracing::debug!(session = session_id, "discarding stale interim translation");
            return;
        }
        let event = self.make_event(session_id, result, false);
        self.registry
            .broadcast(&ServerMessage::Translation { event });
    }

    fn expire_session(&mut self) {
        if let Some(id) = self.session.expire_idle(Instant::now()) {
            self.debounce.clear();
            tracing::debug!(session = id, "session expired after idle timeout");
        }
    }

    fn broadcast_count(&mut self) {
        self.registry.broadcast(&ServerMessage::SubscriberCount {
            count: self.registry.subscriber_count(),
        });
    }

    fn make_event(
        &self,
        session_id: SessionId,
        result: TranslationResult,
        is_final: bool,
    ) -> TranslationEvent {
        TranslationEvent {
            session_id: format!("s{}", session_id),
            source_text: result.source_text,
            translated_text: result.translated_text,
            source_lang: result.source_lang,
            target_lang: result.target_lang,
            is_final,
            timestamp_ms: unix_ms(),
        }
    }
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
