//! Sync-delegation adapter
//!
//! Turns the push-based protocol server into a single synchronous result
//! for one inbound message:
//!
//! 1. A [`CaptureTransport`] is attached to the session's server.
//! 2. The message is handed to the server on its own task.
//! 3. The adapter waits until the capture records something, the handler
//!    finishes, or the method's deadline passes, whichever comes first.
//! 4. The outcome is resolved in priority order: recorded error, first
//!    recorded message, no-response for notifications, timeout.
//!
//! The session's server is closed before the outcome is returned.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DelegationConfig;
use crate::error::ProtocolFailure;
use crate::mcp::server::ProtocolServer;
use crate::mcp::transport::capture::CaptureTransport;
use crate::mcp::transport::Transport;
use crate::mcp::types::{
    Implementation, JsonRpcError, JsonRpcMessage, JsonRpcResponse, ServerCapabilities,
    LATEST_PROTOCOL_VERSION,
};
use crate::metrics::DelegationMetrics;

/// How a delegation resolved.
///
/// `NoResponse` is distinct from a `Reply` whose result is JSON `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum DelegationOutcome {
    /// A response-shaped message to return to the caller
    Reply(serde_json::Value),
    /// The inbound message was a notification and nothing was produced
    NoResponse,
}

impl DelegationOutcome {
    /// The reply body, if any.
    pub fn into_reply(self) -> Option<serde_json::Value> {
        match self {
            Self::Reply(value) => Some(value),
            Self::NoResponse => None,
        }
    }
}

/// Binds one message to one server and resolves a single result.
#[derive(Debug, Clone, Default)]
pub struct SyncDelegationAdapter {
    deadlines: DelegationConfig,
}

impl SyncDelegationAdapter {
    /// Creates an adapter with per-method deadlines.
    pub fn new(deadlines: DelegationConfig) -> Self {
        Self { deadlines }
    }

    /// Delegates `message` using the deadline configured for its method.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(server: std::sync::Arc<dyn ado_mcp::mcp::server::ProtocolServer>) {
    /// use ado_mcp::mcp::delegate::{DelegationOutcome, SyncDelegationAdapter};
    /// use ado_mcp::mcp::types::JsonRpcMessage;
    ///
    /// let adapter = SyncDelegationAdapter::default();
    /// let msg = JsonRpcMessage::parse(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
    /// match adapter.delegate(server, msg).await {
    ///     DelegationOutcome::Reply(body) => println!("{}", body),
    ///     DelegationOutcome::NoResponse => println!("notification"),
    /// }
    /// # }
    /// ```
    pub async fn delegate(
        &self,
        server: Arc<dyn ProtocolServer>,
        message: JsonRpcMessage,
    ) -> DelegationOutcome {
        let deadline = self
            .deadlines
            .deadline_for(message.method().unwrap_or_default());
        self.delegate_with_deadline(server, message, deadline).await
    }

    /// Delegates `message` with an explicit deadline.
    pub async fn delegate_with_deadline(
        &self,
        server: Arc<dyn ProtocolServer>,
        message: JsonRpcMessage,
        deadline: Duration,
    ) -> DelegationOutcome {
        let method = message.method().unwrap_or("response").to_string();
        let request_id = message.id().cloned();
        let is_notification = message.is_notification();
        let metrics = DelegationMetrics::new(&method);

        let capture = Arc::new(CaptureTransport::new());
        if let Err(e) = server.connect(capture.clone()).await {
            capture.report_error(e.to_string());
        }

        let mut handler = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.handle_message(message).await })
        };
        let mut handler_done = false;

        let sleep = tokio::time::sleep(deadline);
        tokio::pin!(sleep);

        while !capture.has_output() {
            tokio::select! {
                _ = capture.notified() => {}
                joined = &mut handler, if !handler_done => {
                    handler_done = true;
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => capture.report_error(e.to_string()),
                        Err(e) => capture.report_error(format!("handler task failed: {}", e)),
                    }
                    // Whatever the server produced is recorded by now.
                    break;
                }
                _ = &mut sleep => break,
            }
        }

        let (outcome, label) = resolve(&capture, request_id, is_notification, handler_done, deadline);

        if !handler_done {
            handler.abort();
        }
        if let Err(e) = server.close().await {
            tracing::debug!(error = %e, "Closing delegated server failed");
        }

        tracing::debug!(method = %method, outcome = label, "Delegation resolved");
        metrics.record_outcome(label);
        outcome
    }
}

fn resolve(
    capture: &CaptureTransport,
    request_id: Option<serde_json::Value>,
    is_notification: bool,
    handler_done: bool,
    deadline: Duration,
) -> (DelegationOutcome, &'static str) {
    if let Some(error) = capture.first_error() {
        let failure = ProtocolFailure::InternalError(error);
        let id = request_id.unwrap_or(serde_json::Value::Null);
        let reply = JsonRpcResponse::failure(id, JsonRpcError::from(failure));
        return (DelegationOutcome::Reply(reply.to_value()), "error");
    }

    if let Some(message) = capture.first_message() {
        return (DelegationOutcome::Reply(message), "response");
    }

    if is_notification {
        return (DelegationOutcome::NoResponse, "no_response");
    }

    let (failure, label) = if handler_done {
        (ProtocolFailure::NoResponse, "empty")
    } else {
        (ProtocolFailure::Timeout(deadline.as_millis() as u64), "timeout")
    };
    let id = request_id.unwrap_or(serde_json::Value::Null);
    let reply = JsonRpcResponse::failure(id, JsonRpcError::from(failure));
    (DelegationOutcome::Reply(reply.to_value()), label)
}

/// The fixed reply to an empty single-shot body.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::delegate::implicit_handshake;
/// use ado_mcp::mcp::types::Implementation;
///
/// let reply = implicit_handshake(&Implementation {
///     name: "ado-mcp".to_string(),
///     version: "0.1.0".to_string(),
///     description: None,
/// });
/// assert_eq!(reply["result"]["serverInfo"]["name"], "ado-mcp");
/// assert!(reply["id"].is_null());
/// ```
pub fn implicit_handshake(server_info: &Implementation) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": null,
        "result": {
            "protocolVersion": LATEST_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::tools_and_prompts(),
            "serverInfo": server_info,
        }
    })
}
