// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-type handler registry and dispatch.
//!
//! Each frame tag owns an ordered list of callbacks. Dispatch invokes the
//! whole list in registration order with a failure boundary around every
//! call, so one panicking consumer cannot starve its siblings.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::message::{ChannelMessage, MessageType};

/// A registered message callback.
pub type Handler = Arc<dyn Fn(&ChannelMessage) + Send + Sync>;

/// Ordered per-type handler lists.
///
/// The registry outlives individual connections: nothing in the connection
/// lifecycle clears it, so registrations survive reconnects.
pub struct HandlerRegistry {
    slots: Mutex<[Vec<Handler>; 4]>,
}

fn slot(kind: MessageType) -> usize {
    match kind {
        MessageType::Chat => 0,
        MessageType::Notification => 1,
        MessageType::System => 2,
        MessageType::Error => 3,
    }
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { slots: Mutex::new(Default::default()) }
    }

    /// Append `handler` to the list for `kind`. Every registration is kept;
    /// there is no deduplication and no removal.
    pub fn register(&self, kind: MessageType, handler: Handler) {
        self.slots.lock()[slot(kind)].push(handler);
    }

    /// Invoke every handler registered for `message`'s type, in registration
    /// order. A panicking handler is logged and the remaining handlers still
    /// run. Frames with no registered handlers are dropped silently.
    ///
    /// The list is snapshotted before the first call, so a handler that
    /// registers new handlers affects the next frame, not the current one.
    pub fn dispatch(&self, message: &ChannelMessage) {
        let snapshot = self.slots.lock()[slot(message.kind)].clone();
        for (idx, handler) in snapshot.iter().enumerate() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(message))) {
                let reason = panic_reason(payload.as_ref());
                tracing::error!(kind = %message.kind, idx, reason, "message handler panicked");
            }
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort extraction of a panic message for logging.
fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
