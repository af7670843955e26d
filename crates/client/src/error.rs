// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types surfaced by the client API.
//!
//! Malformed inbound frames and panicking handlers are absorbed internally
//! (logged, never surfaced); only connect and send failures reach callers.

use std::fmt;

use tokio_tungstenite::tungstenite;

/// Failure of a [`connect`](crate::ChannelClient::connect) attempt.
#[derive(Debug)]
pub enum ConnectError {
    /// The server answered the handshake with an `ERROR` frame. Carries the
    /// server-supplied `content` verbatim.
    HandshakeRejected(String),
    /// The dial failed, or the transport errored before the server delivered
    /// a handshake verdict.
    Transport(tungstenite::Error),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandshakeRejected(content) => f.write_str(content),
            Self::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::HandshakeRejected(_) => None,
            Self::Transport(e) => Some(e),
        }
    }
}

impl From<tungstenite::Error> for ConnectError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Transport(e)
    }
}

/// Returned by [`send_message`](crate::ChannelClient::send_message) when no
/// confirmed connection exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotConnectedError;

impl fmt::Display for NotConnectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not connected")
    }
}

impl std::error::Error for NotConnectedError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
