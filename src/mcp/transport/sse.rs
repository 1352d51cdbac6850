//! Server-Sent-Events stream transport
//!
//! [`SseTransport`] binds one protocol-server instance to one persistent
//! event stream. Its lifecycle is `Open -> Streaming -> Closed`:
//!
//! - `Open` on construction, with a fresh per-connection id.
//! - `Streaming` once [`SseTransport::start`] has announced the message
//!   endpoint. Only in this state are protocol messages written, one event
//!   per message, in production order.
//! - `Closed` on peer disconnect, an explicit [`Transport::close`], or a
//!   failed write. Closing is idempotent and cancels the token returned by
//!   [`SseTransport::closed_token`], which the owning session waits on to
//!   release its server instance.
//!
//! Reported errors travel to the session over [`SessionSignals::errors`]
//! and never close the stream.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::response::sse::Event;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{AdoMcpError, Result};
use crate::mcp::transport::Transport;
use crate::metrics::StreamConnectionMetrics;

/// SSE event name carrying the message-post endpoint.
pub const ENDPOINT_EVENT: &str = "endpoint";

/// SSE event name carrying one JSON-RPC message.
pub const MESSAGE_EVENT: &str = "message";

/// Lifecycle state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed; nothing written yet
    Open,
    /// Writing protocol messages
    Streaming,
    /// Terminal
    Closed,
}

impl StreamState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Open,
            1 => Self::Streaming,
            _ => Self::Closed,
        }
    }
}

/// One framed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name
    pub event: String,
    /// Event payload
    pub data: String,
}

impl SseFrame {
    /// Converts into an axum SSE event.
    pub fn into_event(self) -> Event {
        Event::default().event(self.event).data(self.data)
    }
}

#[derive(Debug)]
struct Inner {
    connection_id: String,
    state: AtomicU8,
    frames: mpsc::UnboundedSender<SseFrame>,
    errors: mpsc::UnboundedSender<String>,
    closed: CancellationToken,
    metrics: StreamConnectionMetrics,
}

/// Outbound half of a stream connection.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct SseTransport {
    inner: Arc<Inner>,
}

/// Body half of a stream connection; feeds the HTTP response.
///
/// Dropping it (the peer went away) closes the transport.
#[derive(Debug)]
pub struct SseStream {
    frames: mpsc::UnboundedReceiver<SseFrame>,
    guard: DisconnectGuard,
}

/// Signals delivered to the session that owns the stream.
#[derive(Debug)]
pub struct SessionSignals {
    /// Reported transport errors
    pub errors: mpsc::UnboundedReceiver<String>,
    /// Cancelled once the stream closes
    pub closed: CancellationToken,
}

#[derive(Debug)]
struct DisconnectGuard {
    transport: SseTransport,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.transport.close_with("peer-disconnect");
    }
}

impl SseTransport {
    /// Opens a new stream connection.
    ///
    /// # Returns
    ///
    /// The transport, the body stream for the HTTP response, and the signals
    /// for the owning session.
    ///
    /// # Examples
    ///
    /// ```
    /// use ado_mcp::mcp::transport::sse::{SseTransport, StreamState};
    ///
    /// let (transport, _stream, _signals) = SseTransport::open();
    /// assert_eq!(transport.state(), StreamState::Open);
    /// assert!(!transport.connection_id().is_empty());
    /// ```
    pub fn open() -> (Self, SseStream, SessionSignals) {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();

        let transport = Self {
            inner: Arc::new(Inner {
                connection_id: uuid::Uuid::new_v4().to_string(),
                state: AtomicU8::new(0),
                frames: frames_tx,
                errors: errors_tx,
                closed: closed.clone(),
                metrics: StreamConnectionMetrics::new(),
            }),
        };

        tracing::debug!(connection_id = %transport.connection_id(), "Stream opened");

        let stream = SseStream {
            frames: frames_rx,
            guard: DisconnectGuard {
                transport: transport.clone(),
            },
        };
        let signals = SessionSignals {
            errors: errors_rx,
            closed,
        };
        (transport, stream, signals)
    }

    /// Unique id of this connection.
    pub fn connection_id(&self) -> &str {
        &self.inner.connection_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// Token cancelled when the stream closes.
    pub fn closed_token(&self) -> CancellationToken {
        self.inner.closed.clone()
    }

    /// Announces `endpoint` to the peer and enters `Streaming`.
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Transport`] unless the stream is `Open`.
    pub fn start(&self, endpoint: &str) -> Result<()> {
        self.inner
            .state
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|s| {
                AdoMcpError::Transport(format!(
                    "cannot start stream in state {:?}",
                    StreamState::from_u8(s)
                ))
            })?;
        self.write(SseFrame {
            event: ENDPOINT_EVENT.to_string(),
            data: endpoint.to_string(),
        })
    }

    fn write(&self, frame: SseFrame) -> Result<()> {
        if self.inner.frames.send(frame).is_err() {
            self.close_with("write-failed");
            return Err(AdoMcpError::Transport(format!(
                "stream {} write failed",
                self.connection_id()
            ))
            .into());
        }
        Ok(())
    }

    /// Moves to `Closed`; returns whether this call did the transition.
    fn close_with(&self, reason: &str) -> bool {
        let previous = self.inner.state.swap(2, Ordering::SeqCst);
        if previous == 2 {
            return false;
        }
        tracing::info!(connection_id = %self.connection_id(), reason, "Stream closed");
        self.inner.metrics.record_closed(reason);
        self.inner.closed.cancel();
        true
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn send(&self, message: serde_json::Value) -> Result<()> {
        match self.state() {
            StreamState::Streaming => {}
            state => {
                return Err(AdoMcpError::Transport(format!(
                    "stream {} is not streaming ({:?})",
                    self.connection_id(),
                    state
                ))
                .into())
            }
        }
        let data = serde_json::to_string(&message)?;
        self.write(SseFrame {
            event: MESSAGE_EVENT.to_string(),
            data,
        })
    }

    fn report_error(&self, error: String) {
        tracing::warn!(connection_id = %self.connection_id(), error = %error, "Stream transport error");
        // The session may already be gone; nothing left to inform.
        let _ = self.inner.errors.send(error);
    }

    async fn close(&self) {
        self.close_with("explicit");
    }
}

impl SseStream {
    /// Next frame, or `None` once the stream has closed.
    ///
    /// Frames queued before closure are still delivered.
    pub async fn next_frame(&mut self) -> Option<SseFrame> {
        let closed = self.guard.transport.closed_token();
        tokio::select! {
            biased;
            frame = self.frames.recv() => frame,
            _ = closed.cancelled() => self.frames.try_recv().ok(),
        }
    }

    /// Adapts into the body stream of an axum `Sse` response.
    pub fn into_events(self) -> impl Stream<Item = std::result::Result<Event, Infallible>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            let frame = stream.next_frame().await?;
            Some((Ok(frame.into_event()), stream))
        })
    }
}
