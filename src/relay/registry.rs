//! Connection registry, publisher arbitration, and broadcast fan-out.
//!
//! The registry owns every connection record and the current-publisher
//! pointer. At most one connection holds the publisher role at any instant;
//! authenticating a new publisher silently demotes the previous one without
//! touching its transport.

use crate::relay::protocol::ServerMessage;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Identifier of one live connection, assigned by the server on accept.
pub type ConnId = u64;

/// Role of a connection. Every connection starts as a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Subscriber,
    Publisher,
}

/// Record for one live connection.
#[derive(Debug)]
struct ConnectionEntry {
    /// Outbound queue feeding the connection's single writer task.
    sender: mpsc::Sender<ServerMessage>,
    role: Role,
    connected_at: Instant,
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Role granted; any previous publisher was demoted to subscriber.
    Granted,
    /// Wrong secret; roles unchanged.
    Rejected,
}

/// Tracks live connections and enforces the single-publisher invariant.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: std::collections::HashMap<ConnId, ConnectionEntry>,
    /// Current publisher, validated against the map on every use so it
    /// never outlives the connection set.
    publisher: Option<ConnId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection with the default subscriber role.
    pub fn register(&mut self, conn: ConnId, sender: mpsc::Sender<ServerMessage>) {
        self.connections.insert(
            conn,
            ConnectionEntry {
                sender,
                role: Role::Subscriber,
                connected_at: Instant::now(),
            },
        );
    }

    /// Remove a connection, clearing the publisher pointer if it held the role.
    pub fn unregister(&mut self, conn: ConnId) {
        if let Some(entry) = self.connections.remove(&conn) {
            tracing::debug!(
                conn,
                connected_for = ?entry.connected_at.elapsed(),
                "connection dropped from registry"
            );
        }
        if self.publisher == Some(conn) {
            self.publisher = None;
        }
    }

    /// Arbitrate a publisher claim.
    ///
    /// On a matching secret the previous publisher (if any, and different)
    /// is demoted to subscriber and `conn` takes the role. A `None`
    /// expected secret rejects every claim.
    pub fn authenticate(
        &mut self,
        conn: ConnId,
        supplied: &str,
        expected: Option<&str>,
    ) -> AuthOutcome {
        let Some(expected) = expected else {
            return AuthOutcome::Rejected;
        };
        if supplied != expected {
            return AuthOutcome::Rejected;
        }
        if !self.connections.contains_key(&conn) {
            return AuthOutcome::Rejected;
        }

        if let Some(previous) = self.publisher
            && previous != conn
            && let Some(entry) = self.connections.get_mut(&previous)
        {
            entry.role = Role::Subscriber;
        }

        if let Some(entry) = self.connections.get_mut(&conn) {
            entry.role = Role::Publisher;
        }
        self.publisher = Some(conn);
        AuthOutcome::Granted
    }

    /// Demote `conn` back to subscriber if it holds the publisher role.
    ///
    /// Returns whether a demotion happened.
    pub fn release(&mut self, conn: ConnId) -> bool {
        if self.publisher != Some(conn) {
            return false;
        }
        if let Some(entry) = self.connections.get_mut(&conn) {
            entry.role = Role::Subscriber;
        }
        self.publisher = None;
        true
    }

    /// Whether `conn` is the current publisher.
    pub fn is_publisher(&self, conn: ConnId) -> bool {
        self.publisher == Some(conn) && self.connections.contains_key(&conn)
    }

    /// Number of subscriber-role connections (the publisher is excluded).
    pub fn subscriber_count(&self) -> usize {
        self.connections
            .values()
            .filter(|entry| entry.role == Role::Subscriber)
            .count()
    }

    /// Send a message to every registered connection.
    ///
    /// Connections whose outbound queue is closed or full are skipped; a
    /// slow or closing connection never blocks delivery to the others.
    /// Per-connection ordering follows invocation order because each queue
    /// feeds a single writer task.
    pub fn broadcast(&self, message: &ServerMessage) {
        for entry in self.connections.values() {
            let _ = entry.sender.try_send(message.clone());
        }
    }

    /// Send a message to one connection, skipping silently if it is gone.
    pub fn send_to(&self, conn: ConnId, message: ServerMessage) {
        if let Some(entry) = self.connections.get(&conn) {
            let _ = entry.sender.try_send(message);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
