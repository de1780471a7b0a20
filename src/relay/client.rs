//! Client side of the relay protocol.
//!
//! Used by the `listen` and `publish` commands; also exercised by the
//! integration tests as a convenient way to speak the wire protocol.

use crate::error::{RelayError, Result};
use crate::relay::protocol::{ClientMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// One open connection to the relay.
pub struct RelayClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl RelayClient {
    /// Connect to a relay at `addr` (host:port).
    ///
    /// # Errors
    /// Returns `RelayError::Connection` if the TCP connect fails.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| RelayError::Connection {
                message: format!("Failed to connect to {}: {}", addr, e),
            })?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            line: String::new(),
        })
    }

    /// Send one message as a JSON line.
    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let json = message.to_json().map_err(|e| RelayError::MalformedMessage {
            message: format!("Failed to serialize message: {}", e),
        })?;

        self.writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| RelayError::Connection {
                message: format!("Failed to write message: {}", e),
            })?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(|e| RelayError::Connection {
                message: format!("Failed to write newline: {}", e),
            })?;
        self.writer
            .flush()
            .await
            .map_err(|e| RelayError::Connection {
                message: format!("Failed to flush writer: {}", e),
            })?;
        Ok(())
    }

    /// Receive the next server message; `None` when the relay closed the
    /// connection.
    pub async fn recv(&mut self) -> Result<Option<ServerMessage>> {
        self.line.clear();
        let read = self
            .reader
            .read_line(&mut self.line)
            .await
            .map_err(|e| RelayError::Connection {
                message: format!("Failed to read from relay: {}", e),
            })?;
        if read == 0 {
            return Ok(None);
        }

        let message =
            ServerMessage::from_json(self.line.trim()).map_err(|e| RelayError::MalformedMessage {
                message: format!("Failed to deserialize server message: {}", e),
            })?;
        Ok(Some(message))
    }

    /// Claim the publisher role, consuming unrelated broadcasts (history
    /// replay, subscriber counts) until the relay answers the claim.
    pub async fn authenticate(&mut self, secret: &str) -> Result<()> {
        self.send(&ClientMessage::Authenticate {
            secret: secret.to_string(),
        })
        .await?;

        while let Some(message) = self.recv().await? {
            match message {
                ServerMessage::AuthSuccess => return Ok(()),
                ServerMessage::AuthFailed => return Err(RelayError::AuthenticationFailed),
                _ => continue,
            }
        }
        Err(RelayError::Connection {
            message: "connection closed during authentication".to_string(),
        })
    }

    /// Send one transcript fragment.
    pub async fn send_fragment(&mut self, text: &str, is_final: bool) -> Result<()> {
        self.send(&ClientMessage::Fragment {
            text: text.to_string(),
            is_final,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::relay::coordinator::Coordinator;
    use crate::relay::server::serve;
    use crate::translate::{MockGateway, TranslationGateway};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn start_relay(secret: &str) -> (String, Arc<MockGateway>) {
        let mut config = Config::default();
        config.auth.secret = secret.to_string();
        // Keep the environment out of tests
        config.auth.secret_env = "TONGYEOK_TEST_SECRET_UNSET".to_string();

        let gateway = Arc::new(MockGateway::new());
        let gateway_dyn: Arc<dyn TranslationGateway> = gateway.clone();
        let (coordinator, events) = Coordinator::new(&config, gateway_dyn);
        tokio::spawn(coordinator.run());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = serve(listener, events).await;
        });
        (addr, gateway)
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let (addr, _gateway) = start_relay("hunter2").await;
        let mut client = RelayClient::connect(&addr).await.unwrap();
        client.authenticate("hunter2").await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate_wrong_secret() {
        let (addr, _gateway) = start_relay("hunter2").await;
        let mut client = RelayClient::connect(&addr).await.unwrap();
        let result = client.authenticate("wrong").await;
        assert!(matches!(result, Err(RelayError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_fragment_without_publisher_role_is_rejected() {
        let (addr, gateway) = start_relay("hunter2").await;
        let mut client = RelayClient::connect(&addr).await.unwrap();

        client.send_fragment("hello", true).await.unwrap();
        loop {
            match client.recv().await.unwrap() {
                Some(ServerMessage::Error { reason }) => {
                    assert!(reason.contains("not the active publisher"));
                    break;
                }
                Some(_) => continue,
                None => panic!("connection closed before error arrived"),
            }
        }
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_reports_error_and_keeps_connection() {
        let (addr, _gateway) = start_relay("hunter2").await;
        let mut client = RelayClient::connect(&addr).await.unwrap();

        client.writer.write_all(b"this is not json\n").await.unwrap();
        client.writer.flush().await.unwrap();

        loop {
            match client.recv().await.unwrap() {
                Some(ServerMessage::Error { reason }) => {
                    assert!(reason.contains("Malformed message"));
                    break;
                }
                Some(_) => continue,
                None => panic!("connection closed on malformed input"),
            }
        }

        // Connection still usable
        client.authenticate("hunter2").await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let result = RelayClient::connect("127.0.0.1:1").await;
        assert!(matches!(result, Err(RelayError::Connection { .. })));
    }
}
