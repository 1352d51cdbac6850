//! Error types for the ADO MCP server
//!
//! This module defines the typed failures that make up the server's error
//! taxonomy, using `thiserror` for ergonomic error handling:
//!
//! - [`AuthFailure`] -- credential presentation and validation failures,
//!   reported before any protocol message is parsed.
//! - [`ExchangeFailure`] -- OAuth authorization-code exchange failures.
//! - [`ProtocolFailure`] -- JSON-RPC level failures, always rendered as a
//!   Response-shaped error envelope.
//! - [`AdoMcpError`] -- the crate-wide error carried inside
//!   [`anyhow::Error`].

use axum::http::StatusCode;
use thiserror::Error;

/// Authentication failures produced by the credential validator and the
/// auth gateway.
///
/// Each variant maps to a fixed HTTP status and a short machine-readable
/// code. The `Display` text is the only detail ever sent to the caller.
///
/// # Examples
///
/// ```
/// use ado_mcp::error::AuthFailure;
///
/// let failure = AuthFailure::MissingOrganization;
/// assert_eq!(failure.code(), "missing-organization");
/// assert_eq!(failure.status().as_u16(), 400);
/// ```
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The `Authorization` header is absent or not a `Bearer` credential
    #[error("Missing or malformed Authorization header; expected 'Bearer <token>'")]
    MissingOrMalformed,

    /// No organization could be resolved for the caller
    #[error("Missing organization; supply the x-ado-organization header")]
    MissingOrganization,

    /// The presented credential was rejected
    #[error("Invalid or expired credential")]
    InvalidCredential,

    /// The selected authentication method is disabled by configuration
    #[error("Authentication method not enabled")]
    NotEnabled,

    /// The selected authentication method lacks required configuration
    #[error("Authentication method not configured")]
    NotConfigured,
}

impl AuthFailure {
    /// HTTP status reported to the caller for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingOrMalformed | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::MissingOrganization => StatusCode::BAD_REQUEST,
            Self::NotEnabled => StatusCode::FORBIDDEN,
            Self::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable kebab-case code used in logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingOrMalformed => "missing-or-malformed",
            Self::MissingOrganization => "missing-organization",
            Self::InvalidCredential => "invalid-credential",
            Self::NotEnabled => "not-enabled",
            Self::NotConfigured => "not-configured",
        }
    }
}

/// Failures of the OAuth authorization-code exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeFailure {
    /// The callback did not carry an authorization code
    #[error("Missing authorization code")]
    MissingCode,

    /// The `state` round-trip value could not be decoded
    #[error("Invalid OAuth state")]
    InvalidState,

    /// The federated scheme's client credentials or signing secret are absent
    #[error("OAuth is not configured on this server")]
    NotConfigured,

    /// The token endpoint did not return a usable access token
    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),
}

impl ExchangeFailure {
    /// HTTP status reported to the caller for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCode | Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::ExchangeFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable kebab-case code used in logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCode => "missing-code",
            Self::InvalidState => "invalid-state",
            Self::NotConfigured => "not-configured",
            Self::ExchangeFailed(_) => "exchange-failed",
        }
    }
}

/// JSON-RPC level failures.
///
/// These are never surfaced as HTTP failures by the delegation path; they
/// are rendered into a Response-shaped error envelope instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolFailure {
    /// The inbound body is not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Valid JSON that is not a well-formed JSON-RPC message
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No handler exists for the requested method
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// The request parameters did not match the method's schema
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The server or a transport failed while handling the message
    #[error("Internal error: {0}")]
    InternalError(String),

    /// No response was produced before the delegation deadline
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// The server finished handling a request without answering it
    #[error("No response produced")]
    NoResponse,
}

impl ProtocolFailure {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i64 {
        match self {
            Self::ParseError(_) => crate::mcp::types::PARSE_ERROR,
            Self::InvalidRequest(_) => crate::mcp::types::INVALID_REQUEST,
            Self::MethodNotFound(_) => crate::mcp::types::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => crate::mcp::types::INVALID_PARAMS,
            Self::InternalError(_) => crate::mcp::types::INTERNAL_ERROR,
            Self::Timeout(_) | Self::NoResponse => crate::mcp::types::REQUEST_TIMEOUT,
        }
    }
}

/// Main error type for ADO MCP server operations
#[derive(Error, Debug)]
pub enum AdoMcpError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failures (closed stream, dropped channel)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Session construction failures
    #[error("Session error: {0}")]
    Session(String),

    /// Downstream API failures; `status` is `None` when the API was unreachable
    #[error("Downstream API error (status {status:?}): {message}")]
    Downstream {
        /// HTTP status returned by the downstream API, if one was received
        status: Option<u16>,
        /// Additional context about the failure
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for ADO MCP operations
///
/// Uses `anyhow::Error` so typed failures can be propagated with context
/// and recovered with `downcast_ref` where a caller must branch on them.
pub type Result<T> = anyhow::Result<T>;
