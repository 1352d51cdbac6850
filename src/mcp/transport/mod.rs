//! Server-side MCP transport abstraction and implementations
//!
//! This module defines the [`Transport`] trait a protocol server writes its
//! outbound messages to. Concrete implementations live in submodules:
//!
//! - [`sse::SseTransport`] -- persistent Server-Sent-Events stream; one event
//!   per message, delivered in production order.
//! - [`capture::CaptureTransport`] -- synthetic in-process transport that
//!   records outbound messages and errors into ordered buffers, used by the
//!   sync-delegation adapter.
//!
//! # Design
//!
//! The server never reads from its transport: inbound messages are handed to
//! [`crate::mcp::server::ProtocolServer::handle_message`] by whichever adapter
//! owns the connection. A transport therefore only needs to accept outbound
//! messages, accept error reports, and close.
//!
//! # Canonical Import Path
//!
//! ```no_run
//! use ado_mcp::mcp::transport::Transport;
//! ```

use crate::error::Result;

/// Abstraction over outbound MCP transports.
///
/// Used polymorphically through `Arc<dyn Transport>`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Deliver one complete JSON-RPC message to the peer.
    ///
    /// # Arguments
    ///
    /// * `message` - A JSON-RPC 2.0 message (response or notification)
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AdoMcpError::Transport`] if the transport is
    /// not accepting messages or the underlying write fails.
    async fn send(&self, message: serde_json::Value) -> Result<()>;

    /// Report a transport-level error to the owning session.
    ///
    /// Reporting never closes the transport.
    fn report_error(&self, error: String);

    /// Close the transport. A second call is a no-op.
    async fn close(&self);
}

pub mod capture;
pub mod sse;
