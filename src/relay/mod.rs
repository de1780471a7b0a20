//! Relay networking: wire protocol, connection registry, coordination
//! loop, and the TCP server/client endpoints.

pub mod client;
pub mod coordinator;
pub mod protocol;
pub mod registry;
pub mod server;

pub use client::RelayClient;
pub use coordinator::{Coordinator, Event};
pub use protocol::{ClientMessage, ServerMessage, TranslationEvent};
pub use registry::{AuthOutcome, ConnId, ConnectionRegistry, Role};
