// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the chat channel protocol.
//!
//! Both directions carry JSON text frames. Inbound frames are tagged with a
//! `type` field from a closed set; chat payloads additionally carry sender
//! metadata. The single outbound protocol frame is the authentication
//! handshake — everything else the client sends is caller-supplied raw text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel `content` of the `SYSTEM` frame that confirms a successful
/// handshake.
pub const CONNECT_SUCCESS: &str = "Connected successfully";

/// Closed set of inbound frame tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Chat,
    Notification,
    System,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "CHAT",
            Self::Notification => "NOTIFICATION",
            Self::System => "SYSTEM",
            Self::Error => "ERROR",
        }
    }

    /// Parse a wire tag. Unknown tags yield `None`, never an error — frames
    /// carrying them are dropped rather than faulted.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "CHAT" => Some(Self::Chat),
            "NOTIFICATION" => Some(Self::Notification),
            "SYSTEM" => Some(Self::System),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed inbound frame.
///
/// `sender_name`, `sender_id`, and `timestamp` are modeled as optional: the
/// server stamps all three on every frame it builds (system traffic carries
/// `SYSTEM`/`System` sender fields), but frames without them still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    #[serde(rename = "senderName", skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(rename = "senderId", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Server-side send time, formatted `yyyy-MM-dd HH:mm:ss`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChannelMessage {
    /// Whether this frame is the server's handshake confirmation.
    pub fn is_connect_success(&self) -> bool {
        self.kind == MessageType::System && self.content == CONNECT_SUCCESS
    }
}

/// Authentication handshake, sent once per connection immediately after the
/// transport opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "userToken")]
    pub user_token: String,
    pub message: String,
}

impl AuthRequest {
    /// Build the authenticate handshake for `token`.
    pub fn authenticate(token: &str) -> Self {
        Self { user_token: token.to_owned(), message: "authenticate".to_owned() }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "userToken": self.user_token,
            "message": self.message,
        })
        .to_string()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
