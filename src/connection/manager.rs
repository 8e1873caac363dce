use crate::protocol::ServerMessage;
use crate::room::SessionHandle;
use crate::state::SyncCore;
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives a single WebSocket connection as a room session
pub struct ConnectionManager {
    core: Arc<SyncCore>,
    outbound_buffer: usize,
}

impl ConnectionManager {
    pub fn new(core: Arc<SyncCore>, outbound_buffer: usize) -> Self {
        Self {
            core,
            outbound_buffer,
        }
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(self, socket: WebSocket) {
        let (handle, mut outbox) = SessionHandle::new(self.outbound_buffer);
        let session_id = self.core.on_connect(handle);
        let (mut sink, mut stream) = socket.split();

        info!(session_id = %session_id, "WebSocket connection established");

        loop {
            tokio::select! {
                // Queued room messages (init snapshot, then updates)
                outbound = outbox.recv() => {
                    match outbound {
                        Some(msg) => {
                            if let Err(e) = send_message(&mut sink, &msg).await {
                                warn!(session_id = %session_id, error = %e, "Failed to send room message");
                                break;
                            }
                        }
                        None => {
                            // Registry dropped our sender: evicted or already left
                            warn!(session_id = %session_id, "Session removed from room, closing");
                            break;
                        }
                    }
                }

                // Incoming client frames
                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.core.on_message(session_id, &text) {
                                if self.core.should_disconnect(&e) {
                                    warn!(session_id = %session_id, error = %e, "Disconnecting session");
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!(session_id = %session_id, "WebSocket client disconnected");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = sink.send(Message::Pong(data)).await {
                                error!(session_id = %session_id, error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Ignore binary, pong messages
                            debug!(session_id = %session_id, "Ignoring non-text frame");
                        }
                        Some(Err(e)) => {
                            warn!(session_id = %session_id, error = %e, "WebSocket error");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        self.core.on_disconnect(session_id);
        let _ = sink.close().await;

        info!(session_id = %session_id, "WebSocket connection closed");
    }
}

/// Serialize and write one room message
async fn send_message<S>(sink: &mut S, msg: &ServerMessage) -> anyhow::Result<()>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
