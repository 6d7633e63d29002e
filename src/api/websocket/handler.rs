//! WebSocket connection handler
//!
//! Each socket is split into a reader loop (runs the [`Session`]) and a writer
//! task that drains the connection's outbound queue. Broadcasts and direct
//! replies share that queue, so a socket only ever has one write in flight.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::events::ServerReply;
use super::registry::{ConnectionId, ConnectionRegistry, SendFailure};
use super::session::{Session, SessionState};
use super::state::HubState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<HubState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection until it closes
async fn handle_socket(socket: WebSocket, state: Arc<HubState>) {
    let registry = Arc::clone(&state.registry);
    let mut shutdown = registry.shutdown_signal();
    let (handle, outbound) = registry.register();
    let id = handle.id();
    let write_timeout = state.config.write_timeout;

    let removal = handle.clone();
    let mut session = Session::new(handle, Arc::clone(&registry));
    let (ws_sender, mut ws_receiver) = socket.split();

    let mut writer = tokio::spawn(writer_task(
        ws_sender,
        outbound,
        Arc::clone(&registry),
        id,
        write_timeout,
    ));
    let mut writer_done = false;

    tracing::info!(connection_id = %id, "WebSocket session started");

    // Shutdown may have started before we subscribed to the signal
    let mut running = !registry.is_shutting_down();

    while running {
        tokio::select! {
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = session.handle_text(&text) {
                            running = queue_reply(&session, &reply);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(connection_id = %id, reason = ?frame, "Client initiated close");
                        running = false;
                    }
                    // Binary frames carry nothing for us; pings are answered by the transport
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %id, error = %e, "WebSocket receive error");
                        running = false;
                    }
                    None => running = false,
                }
            }
            _ = removal.closed() => {
                tracing::debug!(connection_id = %id, "Dropped from registry, closing session");
                running = false;
            }
            _ = shutdown.changed() => {
                tracing::debug!(connection_id = %id, "Hub shutting down, closing session");
                running = false;
            }
            _ = &mut writer => {
                writer_done = true;
                running = false;
            }
        }
    }

    let topic = match session.state() {
        SessionState::Subscribed(topic) => Some(topic.clone()),
        _ => None,
    };
    session.close();
    // Last sender gone: the writer flushes what is queued, sends a close frame and exits
    drop(session);
    drop(removal);

    if !writer_done && timeout(write_timeout, &mut writer).await.is_err() {
        writer.abort();
    }

    tracing::info!(connection_id = %id, topic = ?topic, "WebSocket session closed");
}

/// Queue a direct reply. Returns false if the connection should close.
fn queue_reply(session: &Session, reply: &ServerReply) -> bool {
    let frame = match reply.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(connection_id = %session.id(), error = %e, "Failed to serialize reply");
            return true;
        }
    };

    match session.handle().try_send(frame) {
        Ok(()) => true,
        Err(SendFailure::Full) => {
            tracing::warn!(connection_id = %session.id(), "Send queue full, closing connection");
            false
        }
        Err(SendFailure::Closed) => false,
    }
}

/// Forward queued frames to the socket, one bounded write at a time
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
    write_timeout: Duration,
) {
    while let Some(frame) = outbound.recv().await {
        match timeout(write_timeout, ws_sender.send(Message::Text(frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(connection_id = %id, error = %e, "WebSocket send failed");
                registry.unregister(id);
                return;
            }
            Err(_) => {
                tracing::warn!(
                    connection_id = %id,
                    timeout_ms = write_timeout.as_millis() as u64,
                    "WebSocket write timed out"
                );
                registry.unregister(id);
                return;
            }
        }
    }

    // Queue closed by the session: say goodbye
    let _ = timeout(write_timeout, ws_sender.close()).await;
}
