//! User notification sinks.
//!
//! Notifications are fire-and-forget: a sink never reports back and the cart
//! store never waits on one.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Fire-and-forget "notify user" sink.
pub trait Notifier: Send + Sync {
    /// Deliver a user-facing message.
    fn notify(&self, message: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(notification = %message, "Cart notification");
    }
}

/// Collects the notifications raised while handling one request.
///
/// The HTTP layer turns the collected messages into a toast event for the
/// client.
#[derive(Debug, Default)]
pub struct ToastBuffer {
    messages: Mutex<Vec<String>>,
}

/// Client-side toast event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: &'static str,
    pub messages: Vec<String>,
}

impl ToastBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages collected so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Consume the buffer, returning an error toast if anything was collected.
    #[must_use]
    pub fn into_toast(self) -> Option<Toast> {
        let messages = self
            .messages
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if messages.is_empty() {
            None
        } else {
            Some(Toast {
                level: "error",
                messages,
            })
        }
    }
}

impl Notifier for ToastBuffer {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
