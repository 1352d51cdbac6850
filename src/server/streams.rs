//! Live stream sessions
//!
//! [`StreamRegistry`] owns one task per open SSE stream. Each task holds its
//! session's server and drives it from an inbound queue; the registry keeps
//! only the routing handle (owner organization, queue, transport), so no
//! server instance is ever reachable from another session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::error::{AdoMcpError, Result};
use crate::mcp::server::ProtocolServer;
use crate::mcp::session::TransportSession;
use crate::mcp::transport::sse::{SessionSignals, SseStream, SseTransport};
use crate::mcp::transport::Transport;
use crate::mcp::types::JsonRpcMessage;

/// Path announced in the `endpoint` event; the session id is appended.
pub const MESSAGE_ENDPOINT: &str = "/mcp";

#[derive(Debug, Clone)]
struct StreamHandle {
    organization: String,
    inbound: mpsc::UnboundedSender<JsonRpcMessage>,
    transport: SseTransport,
}

/// Routes posted messages to live stream sessions.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    sessions: RwLock<HashMap<String, StreamHandle>>,
}

impl StreamRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a stream for `session` and starts its task.
    ///
    /// # Returns
    ///
    /// The connection id and the body stream for the HTTP response.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be attached or the stream
    /// cannot be started.
    pub async fn open(self: &Arc<Self>, session: TransportSession) -> Result<(String, SseStream)> {
        let (transport, stream, signals) = SseTransport::open();
        let id = transport.connection_id().to_string();
        let organization = session.identity.organization().to_string();

        session
            .server
            .connect(Arc::new(transport.clone()))
            .await?;
        transport.start(&format!("{}?sessionId={}", MESSAGE_ENDPOINT, id))?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        self.sessions.write().await.insert(
            id.clone(),
            StreamHandle {
                organization: organization.clone(),
                inbound: inbound_tx,
                transport: transport.clone(),
            },
        );

        tracing::info!(connection_id = %id, organization = %organization, "Stream session started");
        tokio::spawn(run_stream_session(
            Arc::clone(self),
            id.clone(),
            session.server,
            transport,
            inbound_rx,
            signals,
        ));

        Ok((id, stream))
    }

    /// Delivers one message into a live session owned by `organization`.
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Session`] if no such session exists for this
    /// organization or it has already closed.
    pub async fn deliver(&self, id: &str, organization: &str, message: JsonRpcMessage) -> Result<()> {
        let handle = self.lookup(id, organization).await?;
        handle
            .inbound
            .send(message)
            .map_err(|_| AdoMcpError::Session(format!("stream session {} has closed", id)).into())
    }

    /// Closes a live session owned by `organization`.
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Session`] if no such session exists for this
    /// organization.
    pub async fn close(&self, id: &str, organization: &str) -> Result<()> {
        let handle = self.lookup(id, organization).await?;
        handle.transport.close().await;
        Ok(())
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn lookup(&self, id: &str, organization: &str) -> Result<StreamHandle> {
        // A session owned by another organization is reported exactly like
        // an unknown one.
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|h| h.organization == organization)
            .cloned()
            .ok_or_else(|| AdoMcpError::Session(format!("unknown stream session {}", id)).into())
    }

    async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }
}

async fn run_stream_session(
    registry: Arc<StreamRegistry>,
    id: String,
    server: Arc<dyn ProtocolServer>,
    transport: SseTransport,
    mut inbound: mpsc::UnboundedReceiver<JsonRpcMessage>,
    mut signals: SessionSignals,
) {
    loop {
        tokio::select! {
            _ = signals.closed.cancelled() => break,
            Some(error) = signals.errors.recv() => {
                tracing::warn!(connection_id = %id, error = %error, "Stream session saw a transport error");
            }
            message = inbound.recv() => {
                let Some(message) = message else { break };
                let server = Arc::clone(&server);
                let transport = transport.clone();
                tokio::spawn(async move {
                    if let Err(e) = server.handle_message(message).await {
                        transport.report_error(e.to_string());
                    }
                });
            }
        }
    }

    registry.remove(&id).await;
    if let Err(e) = server.close().await {
        tracing::debug!(connection_id = %id, error = %e, "Closing stream server failed");
    }
    tracing::info!(connection_id = %id, "Stream session released");
}
