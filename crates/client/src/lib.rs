// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chatlink: WebSocket client for token-authenticated chat channels.
//!
//! One [`ChannelClient`] owns at most one connection to a server's
//! `/ws/chat` endpoint. [`connect`](ChannelClient::connect) performs the
//! one-shot token handshake; inbound JSON frames fan out to per-type
//! handlers registered with [`on_message`](ChannelClient::on_message).

pub mod client;
pub mod dispatch;
pub mod error;
pub mod message;

pub use client::{ChannelClient, ConnectionState, DEFAULT_ENDPOINT};
pub use error::{ConnectError, NotConnectedError};
pub use message::{AuthRequest, ChannelMessage, MessageType, CONNECT_SUCCESS};
