//! MCP protocol types and JSON-RPC 2.0 primitives
//!
//! This module defines the wire types served by the ADO MCP server. All
//! types derive `Debug`, `Clone`, `Serialize`, and `Deserialize` unless noted
//! otherwise. Struct fields are `camelCase` on the wire via
//! `#[serde(rename_all = "camelCase")]`. All `Option<>` fields omit their key
//! from JSON when `None`.
//!
//! [`JsonRpcMessage`] is the tagged union every transport and adapter deals
//! in: a Request expects exactly one Response, a Notification expects none,
//! and a Response answers a Request by `id`.

use crate::error::ProtocolFailure;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Protocol version constants
// ---------------------------------------------------------------------------

/// The most recent supported MCP protocol revision.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-11-25";

/// Streamable-HTTP protocol revision.
pub const PROTOCOL_VERSION_2025_03_26: &str = "2025-03-26";

/// HTTP+SSE protocol revision still used by many clients.
pub const PROTOCOL_VERSION_2024_11_05: &str = "2024-11-05";

/// All protocol versions this server accepts during negotiation.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &[
    LATEST_PROTOCOL_VERSION,
    PROTOCOL_VERSION_2025_03_26,
    PROTOCOL_VERSION_2024_11_05,
];

// ---------------------------------------------------------------------------
// JSON-RPC method constants
// ---------------------------------------------------------------------------

/// Opens a session and negotiates capabilities.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Sent by the client once it has processed the `initialize` response.
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
/// Liveness check.
pub const METHOD_PING: &str = "ping";
/// Lists the tools the server exposes.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Invokes a tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";
/// Lists the prompt templates the server exposes.
pub const METHOD_PROMPTS_LIST: &str = "prompts/list";
/// Renders a prompt template.
pub const METHOD_PROMPTS_GET: &str = "prompts/get";
/// Cancels an in-flight request.
pub const NOTIF_CANCELLED: &str = "notifications/cancelled";

// ---------------------------------------------------------------------------
// JSON-RPC error codes
// ---------------------------------------------------------------------------

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;
/// No response was produced before the delegation deadline.
pub const REQUEST_TIMEOUT: i64 = -32001;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 wire types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request object.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::JsonRpcRequest;
///
/// let req = JsonRpcRequest::new(serde_json::json!(1), "ping", None);
/// assert_eq!(req.jsonrpc, "2.0");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Request correlation identifier.
    pub id: serde_json::Value,
    /// The method name to invoke.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Builds a `"2.0"` request.
    pub fn new(
        id: serde_json::Value,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response object.
///
/// Exactly one of `result` or `error` is present in a response built by
/// [`JsonRpcResponse::success`] or [`JsonRpcResponse::failure`]. A success
/// whose result is JSON `null` still serializes the `result` key.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::JsonRpcResponse;
///
/// let resp = JsonRpcResponse::success(serde_json::json!(1), serde_json::Value::Null);
/// let json = serde_json::to_value(&resp).unwrap();
/// assert!(json.as_object().unwrap().contains_key("result"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Mirrors the `id` from the corresponding request.
    pub id: serde_json::Value,
    /// Successful result value; mutually exclusive with `error`.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<serde_json::Value>,
    /// Error object; mutually exclusive with `result`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Keeps an explicit `"result": null` as `Some(Value::Null)`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Builds a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    pub fn failure(id: serde_json::Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Serializes into a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A JSON-RPC 2.0 error object.
///
/// Implements `Display` as `"JSON-RPC error {code}: {message}"`.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::JsonRpcError;
///
/// let e = JsonRpcError { code: -32600, message: "Invalid Request".to_string(), data: None };
/// assert_eq!(e.to_string(), "JSON-RPC error -32600: Invalid Request");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code as defined by JSON-RPC 2.0 or the MCP protocol.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
    /// Optional additional error context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl From<&ProtocolFailure> for JsonRpcError {
    fn from(failure: &ProtocolFailure) -> Self {
        Self {
            code: failure.code(),
            message: failure.to_string(),
            data: None,
        }
    }
}

impl From<ProtocolFailure> for JsonRpcError {
    fn from(failure: ProtocolFailure) -> Self {
        Self::from(&failure)
    }
}

/// A JSON-RPC 2.0 notification (a request with no `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// The notification method name.
    pub method: String,
    /// Optional notification parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// One protocol message of any kind.
///
/// Classification follows JSON-RPC 2.0: an object with `method` and `id` is
/// a Request, one with `method` and no `id` is a Notification, and one with
/// `result` or `error` is a Response.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::JsonRpcMessage;
///
/// let msg = JsonRpcMessage::parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
/// assert!(msg.is_notification());
/// assert!(msg.id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    /// Expects exactly one Response.
    Request(JsonRpcRequest),
    /// Expects no response.
    Notification(JsonRpcNotification),
    /// Answers a Request.
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Parses a raw body into a message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolFailure::ParseError`] when the body is not JSON, and
    /// [`ProtocolFailure::InvalidRequest`] when it is JSON but not a
    /// JSON-RPC message.
    pub fn parse(body: &str) -> Result<Self, ProtocolFailure> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| ProtocolFailure::ParseError(e.to_string()))?;
        Self::from_value(value)
    }

    /// Classifies an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolFailure::InvalidRequest`] when the value is not a
    /// JSON-RPC message object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolFailure> {
        let obj = value
            .as_object()
            .ok_or_else(|| ProtocolFailure::InvalidRequest("expected a JSON object".to_string()))?;

        let has_id = obj.get("id").is_some_and(|id| !id.is_null());
        let decode_err = |e: serde_json::Error| ProtocolFailure::InvalidRequest(e.to_string());

        if obj.contains_key("method") {
            if has_id {
                serde_json::from_value(value)
                    .map(Self::Request)
                    .map_err(decode_err)
            } else {
                serde_json::from_value(value)
                    .map(Self::Notification)
                    .map_err(decode_err)
            }
        } else if obj.contains_key("result") || obj.contains_key("error") {
            serde_json::from_value(value)
                .map(Self::Response)
                .map_err(decode_err)
        } else {
            Err(ProtocolFailure::InvalidRequest(
                "not a JSON-RPC request, notification, or response".to_string(),
            ))
        }
    }

    /// The `id` of a message that failed to classify, when it is a string
    /// or number; `null` otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use ado_mcp::mcp::types::JsonRpcMessage;
    /// use serde_json::json;
    ///
    /// assert_eq!(JsonRpcMessage::recoverable_id(&json!({"id": 5})), json!(5));
    /// assert!(JsonRpcMessage::recoverable_id(&json!({"id": [1]})).is_null());
    /// assert!(JsonRpcMessage::recoverable_id(&json!([1, 2])).is_null());
    /// ```
    pub fn recoverable_id(value: &serde_json::Value) -> serde_json::Value {
        match value.get("id") {
            Some(id @ (serde_json::Value::String(_) | serde_json::Value::Number(_))) => id.clone(),
            _ => serde_json::Value::Null,
        }
    }

    /// The method name, for Requests and Notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }

    /// The correlation id, for Requests and Responses.
    pub fn id(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => Some(&r.id),
            Self::Notification(_) => None,
        }
    }

    /// Whether this message expects no response.
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }

    /// Serializes into a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        let encoded = match self {
            Self::Request(r) => serde_json::to_value(r),
            Self::Notification(n) => serde_json::to_value(n),
            Self::Response(r) => serde_json::to_value(r),
        };
        encoded.unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Core identity types
// ---------------------------------------------------------------------------

/// Identifies a client or server implementation by name and version.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::Implementation;
///
/// let info = Implementation {
///     name: "ado-mcp".to_string(),
///     version: "0.1.0".to_string(),
///     description: None,
/// };
/// let json = serde_json::to_string(&info).unwrap();
/// assert!(!json.contains("description"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    /// Short name of the implementation.
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Capability types
// ---------------------------------------------------------------------------

/// Capabilities a client advertises during `initialize`.
///
/// Kept opaque: the server never acts on client capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// Experimental capability extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
    /// LLM sampling capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<serde_json::Value>,
    /// Filesystem root capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<serde_json::Value>,
    /// Structured elicitation capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<serde_json::Value>,
}

/// The set of capabilities this server advertises.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::ServerCapabilities;
///
/// let caps = ServerCapabilities::tools_and_prompts();
/// let json = serde_json::to_value(&caps).unwrap();
/// assert!(json.get("tools").is_some());
/// assert!(json.get("resources").is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    /// Experimental capability extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
    /// Server supports log notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<serde_json::Value>,
    /// Server exposes prompts via `prompts/list` and `prompts/get`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<serde_json::Value>,
    /// Server exposes resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<serde_json::Value>,
    /// Server exposes tools via `tools/list` and `tools/call`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
}

impl ServerCapabilities {
    /// Tools and prompts with static lists.
    pub fn tools_and_prompts() -> Self {
        Self {
            prompts: Some(serde_json::json!({ "listChanged": false })),
            tools: Some(serde_json::json!({ "listChanged": false })),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Initialize types
// ---------------------------------------------------------------------------

/// Parameters sent by the client in the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// The protocol version the client wishes to use.
    pub protocol_version: String,
    /// Capabilities advertised by the client.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// Information identifying the client implementation.
    pub client_info: Implementation,
}

/// Response returned by the server to an `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    /// The protocol version the server has selected for this session.
    pub protocol_version: String,
    /// Capabilities advertised by this server.
    pub capabilities: ServerCapabilities,
    /// Information identifying this server implementation.
    pub server_info: Implementation,
    /// Optional human-readable instructions for the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Picks the protocol version to answer a client's request with.
///
/// Echoes the requested version when supported, otherwise offers the latest.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::{negotiate_protocol_version, LATEST_PROTOCOL_VERSION};
///
/// assert_eq!(negotiate_protocol_version("2024-11-05"), "2024-11-05");
/// assert_eq!(negotiate_protocol_version("1999-01-01"), LATEST_PROTOCOL_VERSION);
/// ```
pub fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

// ---------------------------------------------------------------------------
// Tool types
// ---------------------------------------------------------------------------

/// Behavioral hints for tool display and safety classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// Display title for UI presentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// When `true`, the tool only reads state and never mutates it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// When `true`, the tool may interact with the world beyond the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// A tool exposed by this server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Unique name of the tool within the server.
    pub name: String,
    /// Human-readable description of the tool's purpose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema describing the tool's input parameters.
    pub input_schema: serde_json::Value,
    /// Behavioral hints for display and safety classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Response to a `tools/list` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResponse {
    /// All registered tools.
    pub tools: Vec<McpTool>,
    /// Opaque cursor for the next page; always `None` here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Parameters for a `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolParams {
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments to pass to the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    /// Optional extension metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Response from a `tools/call` request.
///
/// Tool-level failures (for example a downstream 404) are reported with
/// `is_error: Some(true)` rather than as a JSON-RPC error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResponse {
    /// The content items produced by the tool.
    pub content: Vec<ToolResponseContent>,
    /// When `true`, the tool signalled an error condition within its content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResponse {
    /// A single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResponseContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// A single text item flagged as an error.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResponseContent::Text { text: text.into() }],
            is_error: Some(true),
        }
    }
}

/// A single content item in a tool response.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::types::ToolResponseContent;
///
/// let c = ToolResponseContent::Text { text: "hello".to_string() };
/// let json = serde_json::to_value(&c).unwrap();
/// assert_eq!(json["type"], "text");
/// assert_eq!(json["text"], "hello");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolResponseContent {
    /// Plain text output.
    Text {
        /// The text content.
        text: String,
    },
}

// ---------------------------------------------------------------------------
// Prompt types
// ---------------------------------------------------------------------------

/// The author of a prompt message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message from the human user.
    User,
    /// A message from the AI assistant.
    Assistant,
}

/// Content within a prompt message, discriminated by `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    /// Plain text.
    Text {
        /// The text body.
        text: String,
    },
}

/// A single message in a prompt conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMessage {
    /// Who authored this message.
    pub role: Role,
    /// The message body.
    pub content: MessageContent,
}

/// Describes a single argument accepted by a prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description of what this argument controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When `true`, this argument must be supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Metadata describing a prompt template exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Unique name of this prompt.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Argument descriptors for this template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgument>>,
}

/// Response to a `prompts/list` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResponse {
    /// All registered prompts.
    pub prompts: Vec<Prompt>,
    /// Opaque cursor for the next page; always `None` here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Parameters for `prompts/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPromptParams {
    /// Name of the prompt to retrieve.
    pub name: String,
    /// Template argument substitutions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<HashMap<String, String>>,
}

/// Response to a `prompts/get` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPromptResponse {
    /// Human-readable description of what this prompt does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The rendered prompt messages.
    pub messages: Vec<PromptMessage>,
}
