//! Synthetic in-process transport used for sync delegation
//!
//! [`CaptureTransport`] records every outbound message into an ordered
//! buffer instead of writing to a socket, and every reported error into a
//! separate buffer. Each record wakes one waiter through
//! [`CaptureTransport::notified`], so the delegating adapter resolves as soon
//! as something is available rather than sleeping out its deadline.
//!
//! # Example
//!
//! ```
//! use ado_mcp::mcp::transport::capture::CaptureTransport;
//! use ado_mcp::mcp::transport::Transport;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let capture = CaptureTransport::new();
//! capture.send(serde_json::json!({"jsonrpc":"2.0","id":1,"result":{}})).await.unwrap();
//! assert_eq!(capture.first_message().unwrap()["id"], 1);
//! assert!(capture.first_error().is_none());
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::error::{AdoMcpError, Result};
use crate::mcp::transport::Transport;

/// Records outbound messages and errors for a single delegation.
#[derive(Debug, Default)]
pub struct CaptureTransport {
    messages: Mutex<Vec<serde_json::Value>>,
    errors: Mutex<Vec<String>>,
    notify: Notify,
    closed: AtomicBool,
}

impl CaptureTransport {
    /// Create an empty capture transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the next message or error is recorded.
    ///
    /// A record made while nobody is waiting is remembered, so a waiter that
    /// arrives late still wakes immediately.
    pub async fn notified(&self) {
        self.notify.notified().await
    }

    /// Whether any message or error has been recorded.
    pub fn has_output(&self) -> bool {
        !lock(&self.messages).is_empty() || !lock(&self.errors).is_empty()
    }

    /// The first recorded message, if any.
    pub fn first_message(&self) -> Option<serde_json::Value> {
        lock(&self.messages).first().cloned()
    }

    /// The first recorded error, if any.
    pub fn first_error(&self) -> Option<String> {
        lock(&self.errors).first().cloned()
    }

    /// All recorded messages, in recording order.
    pub fn messages(&self) -> Vec<serde_json::Value> {
        lock(&self.messages).clone()
    }

    /// Whether [`Transport::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// Buffers hold plain data, so a poisoned lock still holds a usable value.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl Transport for CaptureTransport {
    async fn send(&self, message: serde_json::Value) -> Result<()> {
        if self.is_closed() {
            return Err(AdoMcpError::Transport("capture transport closed".to_string()).into());
        }
        lock(&self.messages).push(message);
        self.notify.notify_one();
        Ok(())
    }

    fn report_error(&self, error: String) {
        tracing::debug!(error = %error, "Captured transport error");
        lock(&self.errors).push(error);
        self.notify.notify_one();
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
