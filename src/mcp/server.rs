//! Message-oriented MCP server
//!
//! [`ProtocolServer`] is the seam every transport adapter binds to: connect
//! a [`Transport`], hand it inbound messages, close it. [`McpServer`] is the
//! default implementation. Each instance belongs to exactly one session and
//! is never shared or reused.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::RwLock;

use crate::error::{AdoMcpError, ProtocolFailure, Result};
use crate::mcp::transport::Transport;
use crate::mcp::types::{
    negotiate_protocol_version, CallToolParams, CallToolResponse, GetPromptParams,
    GetPromptResponse, Implementation, InitializeParams, InitializeResponse, JsonRpcError,
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListPromptsResponse,
    ListToolsResponse, McpTool, Prompt, ServerCapabilities, METHOD_INITIALIZE, METHOD_INITIALIZED,
    METHOD_PING, METHOD_PROMPTS_GET, METHOD_PROMPTS_LIST, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    NOTIF_CANCELLED,
};

/// Convenience alias for a boxed, `Send`-safe async future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handles one `tools/call` invocation; receives the raw `arguments` value.
pub type ToolHandler =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<CallToolResponse>> + Send + Sync>;

/// Renders one prompt; receives the template arguments.
pub type PromptHandler = Arc<
    dyn Fn(HashMap<String, String>) -> BoxFuture<'static, Result<GetPromptResponse>> + Send + Sync,
>;

/// A protocol server that adapters can bind to.
#[async_trait::async_trait]
pub trait ProtocolServer: Send + Sync {
    /// Attaches the transport outbound messages are written to.
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Session`] if the server has been closed.
    async fn connect(&self, transport: Arc<dyn Transport>) -> Result<()>;

    /// Handles one inbound message, writing any response to the transport.
    ///
    /// # Errors
    ///
    /// Returns an error only when the response could not be delivered.
    /// Protocol failures are answered as JSON-RPC error responses.
    async fn handle_message(&self, message: JsonRpcMessage) -> Result<()>;

    /// Releases the server and closes its transport.
    async fn close(&self) -> Result<()>;
}

struct RegisteredTool {
    definition: McpTool,
    handler: ToolHandler,
}

struct RegisteredPrompt {
    definition: Prompt,
    handler: PromptHandler,
}

/// Default MCP server: tools and prompts over JSON-RPC.
pub struct McpServer {
    info: Implementation,
    instructions: Option<String>,
    tools: BTreeMap<String, RegisteredTool>,
    prompts: BTreeMap<String, RegisteredPrompt>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    peer_info: Arc<OnceLock<Implementation>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("info", &self.info)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl McpServer {
    /// Creates a server with no tools or prompts.
    ///
    /// # Examples
    ///
    /// ```
    /// use ado_mcp::mcp::server::McpServer;
    /// use ado_mcp::mcp::types::Implementation;
    ///
    /// let server = McpServer::new(Implementation {
    ///     name: "ado-mcp".to_string(),
    ///     version: "0.1.0".to_string(),
    ///     description: None,
    /// });
    /// assert!(server.tool_names().is_empty());
    /// assert!(server.peer_info().is_none());
    /// ```
    pub fn new(info: Implementation) -> Self {
        Self {
            info,
            instructions: None,
            tools: BTreeMap::new(),
            prompts: BTreeMap::new(),
            transport: RwLock::new(None),
            peer_info: Arc::new(OnceLock::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Sets the `instructions` returned from `initialize`.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register_tool<F, Fut>(&mut self, definition: McpTool, handler: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResponse>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(move |args| Box::pin(handler(args)));
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                handler,
            },
        );
    }

    /// Registers a prompt, replacing any prompt with the same name.
    pub fn register_prompt<F, Fut>(&mut self, definition: Prompt, handler: F)
    where
        F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GetPromptResponse>> + Send + 'static,
    {
        let handler: PromptHandler = Arc::new(move |args| Box::pin(handler(args)));
        self.prompts.insert(
            definition.name.clone(),
            RegisteredPrompt {
                definition,
                handler,
            },
        );
    }

    /// Names of registered tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Names of registered prompts, sorted.
    pub fn prompt_names(&self) -> Vec<String> {
        self.prompts.keys().cloned().collect()
    }

    /// Client info declared by the peer during `initialize`.
    pub fn peer_info(&self) -> Option<Implementation> {
        self.peer_info.get().cloned()
    }

    /// Shared slot the peer's client info is written to once the handshake
    /// completes.
    pub fn peer_info_handle(&self) -> Arc<OnceLock<Implementation>> {
        Arc::clone(&self.peer_info)
    }

    async fn send(&self, message: serde_json::Value) -> Result<()> {
        let transport = self.transport.read().await.clone();
        match transport {
            Some(transport) => transport.send(message).await,
            None => Err(AdoMcpError::Transport("server has no transport".to_string()).into()),
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Result<()> {
        tracing::debug!(method = %request.method, id = %request.id, "Handling request");
        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(failure) => {
                tracing::debug!(error = %failure, "Request failed");
                JsonRpcResponse::failure(request.id, JsonRpcError::from(&failure))
            }
        };
        self.send(response.to_value()).await
    }

    fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            METHOD_INITIALIZED => tracing::debug!("Client completed initialization"),
            NOTIF_CANCELLED => tracing::debug!(params = ?notification.params, "Client cancelled a request"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> std::result::Result<serde_json::Value, ProtocolFailure> {
        match method {
            METHOD_INITIALIZE => to_value(self.initialize(parse_params(params)?)),
            METHOD_PING => Ok(serde_json::json!({})),
            METHOD_TOOLS_LIST => to_value(ListToolsResponse {
                tools: self.tools.values().map(|t| t.definition.clone()).collect(),
                next_cursor: None,
            }),
            METHOD_TOOLS_CALL => to_value(self.call_tool(parse_params(params)?).await?),
            METHOD_PROMPTS_LIST => to_value(ListPromptsResponse {
                prompts: self.prompts.values().map(|p| p.definition.clone()).collect(),
                next_cursor: None,
            }),
            METHOD_PROMPTS_GET => to_value(self.get_prompt(parse_params(params)?).await?),
            other => Err(ProtocolFailure::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self, params: InitializeParams) -> InitializeResponse {
        let version = negotiate_protocol_version(&params.protocol_version);
        tracing::info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = version,
            "Handshake"
        );
        // The first handshake wins; a repeated initialize keeps the original.
        let _ = self.peer_info.set(params.client_info);

        InitializeResponse {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities::tools_and_prompts(),
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        }
    }

    async fn call_tool(
        &self,
        params: CallToolParams,
    ) -> std::result::Result<CallToolResponse, ProtocolFailure> {
        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| ProtocolFailure::InvalidParams(format!("Unknown tool: {}", params.name)))?;

        let arguments = params
            .arguments
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        match (tool.handler)(arguments).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool failed");
                Ok(CallToolResponse::error(format!("Error: {}", e)))
            }
        }
    }

    async fn get_prompt(
        &self,
        params: GetPromptParams,
    ) -> std::result::Result<GetPromptResponse, ProtocolFailure> {
        let prompt = self.prompts.get(&params.name).ok_or_else(|| {
            ProtocolFailure::InvalidParams(format!("Unknown prompt: {}", params.name))
        })?;

        let arguments = params.arguments.unwrap_or_default();
        if let Some(required) = &prompt.definition.arguments {
            for arg in required.iter().filter(|a| a.required == Some(true)) {
                if !arguments.contains_key(&arg.name) {
                    return Err(ProtocolFailure::InvalidParams(format!(
                        "Missing required argument: {}",
                        arg.name
                    )));
                }
            }
        }

        (prompt.handler)(arguments)
            .await
            .map_err(|e| ProtocolFailure::InternalError(e.to_string()))
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<serde_json::Value>,
) -> std::result::Result<T, ProtocolFailure> {
    let value = params.unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|e| ProtocolFailure::InvalidParams(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: T) -> std::result::Result<serde_json::Value, ProtocolFailure> {
    serde_json::to_value(value).map_err(|e| ProtocolFailure::InternalError(e.to_string()))
}

#[async_trait::async_trait]
impl ProtocolServer for McpServer {
    async fn connect(&self, transport: Arc<dyn Transport>) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AdoMcpError::Session("server is closed".to_string()).into());
        }
        *self.transport.write().await = Some(transport);
        Ok(())
    }

    async fn handle_message(&self, message: JsonRpcMessage) -> Result<()> {
        match message {
            JsonRpcMessage::Request(request) => self.handle_request(request).await,
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification);
                Ok(())
            }
            JsonRpcMessage::Response(response) => {
                tracing::debug!(id = %response.id, "Ignoring unsolicited response");
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(transport) = self.transport.write().await.take() {
            transport.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::transport::capture::CaptureTransport;
    use crate::mcp::types::{PromptArgument, PromptMessage, MessageContent, Role, METHOD_NOT_FOUND, INVALID_PARAMS};
    use serde_json::json;

    fn server() -> McpServer {
        let mut server = McpServer::new(Implementation {
            name: "ado-mcp".to_string(),
            version: "0.1.0".to_string(),
            description: None,
        });
        server.register_tool(
            McpTool {
                name: "echo".to_string(),
                description: Some("Echo arguments".to_string()),
                input_schema: json!({"type": "object"}),
                annotations: None,
            },
            |args| async move { Ok(CallToolResponse::text(args.to_string())) },
        );
        server.register_tool(
            McpTool {
                name: "fail".to_string(),
                description: None,
                input_schema: json!({"type": "object"}),
                annotations: None,
            },
            |_| async move { Err(anyhow::anyhow!("downstream exploded")) },
        );
        server.register_prompt(
            Prompt {
                name: "greet".to_string(),
                description: None,
                arguments: Some(vec![PromptArgument {
                    name: "who".to_string(),
                    description: None,
                    required: Some(true),
                }]),
            },
            |args| async move {
                Ok(GetPromptResponse {
                    description: None,
                    messages: vec![PromptMessage {
                        role: Role::User,
                        content: MessageContent::Text {
                            text: format!("hello {}", args["who"]),
                        },
                    }],
                })
            },
        );
        server
    }

    async fn roundtrip(server: &McpServer, body: serde_json::Value) -> serde_json::Value {
        let capture = Arc::new(CaptureTransport::new());
        server.connect(capture.clone()).await.unwrap();
        server
            .handle_message(JsonRpcMessage::from_value(body).unwrap())
            .await
            .unwrap();
        capture.first_message().expect("no response")
    }

    #[tokio::test]
    async fn test_initialize_records_peer() {
        let server = server();
        let resp = roundtrip(
            &server,
            json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{
                "protocolVersion":"2024-11-05",
                "capabilities":{},
                "clientInfo":{"name":"inspector","version":"1.0"}
            }}),
        )
        .await;
        assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(resp["result"]["serverInfo"]["name"], "ado-mcp");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
        assert_eq!(server.peer_info().unwrap().name, "inspector");
    }

    #[tokio::test]
    async fn test_tools_list() {
        let resp = roundtrip(&server(), json!({"jsonrpc":"2.0","id":2,"method":"tools/list"})).await;
        let names: Vec<_> = resp["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["echo", "fail"]);
    }

    #[tokio::test]
    async fn test_tool_call_success() {
        let resp = roundtrip(
            &server(),
            json!({"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"x":1}}}),
        )
        .await;
        assert_eq!(resp["id"], 3);
        assert_eq!(resp["result"]["content"][0]["text"], r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn test_tool_failure_is_error_result() {
        let resp = roundtrip(
            &server(),
            json!({"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"fail"}}),
        )
        .await;
        assert_eq!(resp["result"]["isError"], true);
        assert!(resp.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let resp = roundtrip(
            &server(),
            json!({"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = roundtrip(&server(), json!({"jsonrpc":"2.0","id":"x","method":"resources/list"})).await;
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(resp["id"], "x");
    }

    #[tokio::test]
    async fn test_prompt_requires_arguments() {
        let server = server();
        let resp = roundtrip(
            &server,
            json!({"jsonrpc":"2.0","id":6,"method":"prompts/get","params":{"name":"greet"}}),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);

        let resp = roundtrip(
            &server,
            json!({"jsonrpc":"2.0","id":7,"method":"prompts/get","params":{"name":"greet","arguments":{"who":"ada"}}}),
        )
        .await;
        assert_eq!(resp["result"]["messages"][0]["content"]["text"], "hello ada");
    }

    #[tokio::test]
    async fn test_notification_produces_nothing() {
        let server = server();
        let capture = Arc::new(CaptureTransport::new());
        server.connect(capture.clone()).await.unwrap();
        server
            .handle_message(
                JsonRpcMessage::parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!capture.has_output());
    }

    #[tokio::test]
    async fn test_request_without_transport_fails() {
        let server = server();
        let result = server
            .handle_message(JsonRpcMessage::parse(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_close_closes_transport_and_refuses_connect() {
        let server = server();
        let capture = Arc::new(CaptureTransport::new());
        server.connect(capture.clone()).await.unwrap();
        server.close().await.unwrap();
        server.close().await.unwrap();
        assert!(capture.is_closed());
        assert!(server.connect(Arc::new(CaptureTransport::new())).await.is_err());
    }
}
