//! TCP relay server.
//!
//! Accepts connections and bridges them to the coordinator: one reader
//! task parsing line-delimited JSON into events, one writer task draining
//! the connection's outbound queue. The coordinator never touches sockets.

use crate::defaults;
use crate::error::{RelayError, Result};
use crate::relay::coordinator::Event;
use crate::relay::protocol::{ClientMessage, ServerMessage};
use crate::relay::registry::ConnId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Accept connections on `listener` and feed the coordinator until it stops.
pub async fn serve(listener: TcpListener, events: mpsc::Sender<Event>) -> Result<()> {
    if let Ok(local) = listener.local_addr() {
        tracing::info!(%local, "relay listening");
    }

    let mut next_conn: ConnId = 1;
    loop {
        let (stream, peer) = listener.accept().await.map_err(|e| RelayError::Connection {
            message: format!("Failed to accept connection: {}", e),
        })?;

        let conn = next_conn;
        next_conn += 1;
        tracing::debug!(conn, %peer, "connection accepted");

        let events = events.clone();
        tokio::spawn(async move {
            handle_connection(conn, stream, events).await;
        });
    }
}

/// Drive one connection until its transport closes or the coordinator stops.
async fn handle_connection(conn: ConnId, stream: TcpStream, events: mpsc::Sender<Event>) {
    let (reader, writer) = stream.into_split();
    let (out_tx, out_rx) = mpsc::channel(defaults::OUTBOUND_QUEUE);

    if events
        .send(Event::Connected {
            conn,
            sender: out_tx,
        })
        .await
        .is_err()
    {
        // Coordinator already stopped; nothing to bridge
        return;
    }

    tokio::spawn(write_outbound(conn, writer, out_rx));

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let event = match ClientMessage::from_json(trimmed) {
                    Ok(message) => Event::Inbound { conn, message },
                    Err(e) => Event::Malformed {
                        conn,
                        detail: e.to_string(),
                    },
                };
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(conn, "read failed: {e}");
                break;
            }
        }
    }

    let _ = events.send(Event::Disconnected { conn }).await;
}

/// Drain the outbound queue into the socket, one JSON line per message.
///
/// Exits when the coordinator drops the queue sender (unregister) or the
/// peer stops accepting writes.
async fn write_outbound(
    conn: ConnId,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(conn, "skipping unserializable message: {e}");
                continue;
            }
        };
        if writer.write_all(json.as_bytes()).await.is_err() {
            break;
        }
        if writer.write_all(b"\n").await.is_err() {
            break;
        }
    }
}
