// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel client: one WebSocket connection, a token handshake, and fan-out
//! of inbound frames to registered handlers.
//!
//! Each `connect` call spawns a connection task that owns the socket
//! exclusively and drives both directions. The task is tagged with a
//! generation number taken under the state lock; every state mutation it
//! performs re-checks that generation, so late events from a superseded
//! transport can never corrupt the state of its successor.

use std::fmt;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::dispatch::HandlerRegistry;
use crate::error::{ConnectError, NotConnectedError};
use crate::message::{AuthRequest, ChannelMessage, MessageType};

/// Default server base address.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080";

/// Channel path appended to the endpoint for every connection.
const CHAT_PATH: &str = "/ws/chat";

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Handle to the current connection task.
struct ConnHandle {
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

/// State shared between the public handle and connection tasks.
struct Shared {
    state: ConnectionState,
    /// Generation of the connection allowed to mutate this state. Bumped on
    /// every `connect` and `disconnect`; a task carrying an older generation
    /// no-ops instead of touching anything.
    generation: u64,
    conn: Option<ConnHandle>,
}

/// WebSocket client for a token-authenticated chat channel.
///
/// Owns at most one transport at a time. [`connect`](Self::connect) replaces
/// any prior connection; registered handlers persist across replacements.
/// All methods take `&self`, so a client can be shared behind an [`Arc`].
pub struct ChannelClient {
    endpoint: String,
    shared: Arc<Mutex<Shared>>,
    handlers: Arc<HandlerRegistry>,
}

impl ChannelClient {
    /// Client for the default endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Client for `endpoint` (base address, e.g. `ws://chat.example.com:9001`).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                generation: 0,
                conn: None,
            })),
            handlers: Arc::new(HandlerRegistry::new()),
        }
    }

    /// The configured base address.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Full URL of the chat channel.
    fn chat_url(&self) -> String {
        format!("{}{CHAT_PATH}", self.endpoint.trim_end_matches('/'))
    }

    /// Open a connection and authenticate with `token`.
    ///
    /// Any prior connection is told to close first; the new transport is
    /// dialed immediately without waiting for that shutdown. The returned
    /// future resolves once the server confirms the handshake and fails when
    /// the server answers with an `ERROR` frame or the transport errors. If
    /// the socket closes without either, the future never settles — wrap it
    /// in [`tokio::time::timeout`] to bound the wait.
    pub async fn connect(&self, token: &str) -> Result<(), ConnectError> {
        let url = self.chat_url();
        let handshake = AuthRequest::authenticate(token).to_json();
        let (verdict_tx, verdict_rx) = oneshot::channel();

        let generation = {
            let mut shared = self.shared.lock();
            if let Some(conn) = shared.conn.take() {
                conn.cancel.cancel();
            }
            shared.generation += 1;
            shared.state = ConnectionState::Connecting;
            shared.generation
        };

        tokio::spawn(run_connection(
            Arc::clone(&self.shared),
            Arc::clone(&self.handlers),
            generation,
            url,
            handshake,
            verdict_tx,
        ));

        match verdict_rx.await {
            Ok(verdict) => verdict,
            // The task dropped the sender without settling: the socket
            // closed before the server delivered a verdict, or a newer
            // connect superseded this one. The attempt stays unresolved;
            // callers bound the wait with their own timeout.
            Err(_) => std::future::pending().await,
        }
    }

    /// Queue `payload` verbatim as a single text frame on the current
    /// connection. The frame is not JSON-wrapped.
    ///
    /// Fails unless the server has confirmed the connection. The call is
    /// synchronous; delivery is best-effort once queued.
    pub fn send_message(&self, payload: &str) -> Result<(), NotConnectedError> {
        let shared = self.shared.lock();
        match shared.conn.as_ref() {
            Some(conn) if shared.state == ConnectionState::Connected => {
                conn.outbound.send(payload.to_owned()).map_err(|_| NotConnectedError)
            }
            _ => Err(NotConnectedError),
        }
    }

    /// Register `handler` for inbound frames of type `kind`.
    ///
    /// Handlers for the same type run in registration order, receive every
    /// matching frame, and persist across reconnects.
    pub fn on_message<F>(&self, kind: MessageType, handler: F)
    where
        F: Fn(&ChannelMessage) + Send + Sync + 'static,
    {
        self.handlers.register(kind, Arc::new(handler));
    }

    /// Close the current connection, if any. Safe to call when nothing is
    /// open. Registered handlers are kept.
    ///
    /// A connect still waiting for its verdict is abandoned: its future
    /// never settles, same as a close without a verdict.
    pub fn disconnect(&self) {
        let mut shared = self.shared.lock();
        if let Some(conn) = shared.conn.take() {
            conn.cancel.cancel();
        }
        shared.generation += 1;
        shared.state = ConnectionState::Disconnected;
    }

    /// Whether the server has confirmed the current connection.
    pub fn is_connected(&self) -> bool {
        self.shared.lock().state == ConnectionState::Connected
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }
}

impl Default for ChannelClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        f.debug_struct("ChannelClient")
            .field("endpoint", &self.endpoint)
            .field("state", &shared.state)
            .finish()
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

fn is_current(shared: &Mutex<Shared>, generation: u64) -> bool {
    shared.lock().generation == generation
}

/// Set `state` if `generation` still owns the client. Returns whether it did.
fn set_state_if_current(shared: &Mutex<Shared>, generation: u64, state: ConnectionState) -> bool {
    let mut sh = shared.lock();
    if sh.generation != generation {
        return false;
    }
    sh.state = state;
    true
}

/// Flip to `Disconnected` and drop the stored handle if `generation` still
/// owns the client. Returns whether it did.
fn teardown_if_current(shared: &Mutex<Shared>, generation: u64) -> bool {
    let mut sh = shared.lock();
    if sh.generation != generation {
        return false;
    }
    sh.state = ConnectionState::Disconnected;
    sh.conn = None;
    true
}

/// Drive one transport: dial, send the handshake, then pump frames until the
/// socket closes or the connection is superseded.
async fn run_connection(
    shared: Arc<Mutex<Shared>>,
    handlers: Arc<HandlerRegistry>,
    generation: u64,
    url: String,
    handshake: String,
    verdict_tx: oneshot::Sender<Result<(), ConnectError>>,
) {
    let (mut stream, _response) = match tokio_tungstenite::connect_async(&url).await {
        Ok(parts) => parts,
        Err(e) => {
            tracing::debug!(url = %url, err = %e, "dial failed");
            if teardown_if_current(&shared, generation) {
                let _ = verdict_tx.send(Err(ConnectError::Transport(e)));
            }
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let cancel = CancellationToken::new();

    let installed = {
        let mut sh = shared.lock();
        if sh.generation == generation {
            sh.conn = Some(ConnHandle { outbound: outbound_tx, cancel: cancel.clone() });
            true
        } else {
            false
        }
    };
    if !installed {
        tracing::debug!(url = %url, "connection superseded before install");
        let _ = stream.close(None).await;
        return;
    }

    let (mut ws_tx, mut ws_rx) = stream.split();

    // Authenticate first; the server's verdict arrives as ordinary frames.
    if let Err(e) = ws_tx.send(Message::Text(handshake.into())).await {
        tracing::debug!(url = %url, err = %e, "handshake send failed");
    }

    let mut verdict = Some(verdict_tx);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // disconnect() or a newer connect took over. State is
                // already theirs; just shut the socket down.
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(text) => {
                        if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                            tracing::debug!(err = %e, "outbound send failed");
                        }
                    }
                    // Handle dropped by the client; nothing more to write.
                    None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let frame: ChannelMessage = match serde_json::from_str(&text) {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::debug!(err = %e, "drop malformed frame");
                                continue;
                            }
                        };
                        if !is_current(&shared, generation) {
                            break;
                        }
                        handlers.dispatch(&frame);
                        if verdict.is_none() {
                            continue;
                        }
                        if frame.is_connect_success() {
                            if set_state_if_current(&shared, generation, ConnectionState::Connected) {
                                if let Some(tx) = verdict.take() {
                                    let _ = tx.send(Ok(()));
                                }
                            } else {
                                break;
                            }
                        } else if frame.kind == MessageType::Error {
                            if set_state_if_current(&shared, generation, ConnectionState::Disconnected) {
                                if let Some(tx) = verdict.take() {
                                    let _ = tx.send(Err(ConnectError::HandshakeRejected(frame.content)));
                                }
                            } else {
                                break;
                            }
                        }
                        // Any other frame while the verdict is pending just
                        // dispatched; keep waiting for a qualifying one.
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(url = %url, "transport closed");
                        teardown_if_current(&shared, generation);
                        // A close without a verdict does not settle the
                        // handshake; the pending connect stays pending.
                        break;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary ignored
                    Some(Err(e)) => {
                        tracing::debug!(url = %url, err = %e, "transport error");
                        if teardown_if_current(&shared, generation) {
                            if let Some(tx) = verdict.take() {
                                let _ = tx.send(Err(ConnectError::Transport(e)));
                            }
                        }
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
