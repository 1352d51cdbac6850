//! Configuration management for the ADO MCP server
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Configuration is read once at startup and shared as an immutable
//! `Arc<Config>`; no component looks settings up ambiently afterwards.

use crate::error::{AdoMcpError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for the server
///
/// Holds the listen address, the two authentication schemes' toggles and
/// secrets, the downstream API location, and the sync-delegation deadlines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication scheme toggles and secrets
    #[serde(default)]
    pub auth: AuthConfig,
    /// Downstream Azure DevOps API settings
    #[serde(default)]
    pub ado: AdoConfig,
    /// Sync-delegation deadlines
    #[serde(default)]
    pub delegation: DelegationConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Static server name announced in `serverInfo` and the user agent
    #[serde(default = "default_server_name")]
    pub name: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_server_name() -> String {
    "ado-mcp".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            name: default_server_name(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication configuration
///
/// The credential-token scheme (personal access tokens) and the federated
/// scheme (locally signed session tokens wrapping an OAuth access token)
/// are toggled independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accept personal access tokens validated against the downstream API
    #[serde(default = "default_pat_enabled")]
    pub pat_enabled: bool,

    /// Accept federated session tokens minted by the OAuth callback
    #[serde(default)]
    pub oauth_enabled: bool,

    /// Shared secret used to sign and verify federated session tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// `iss` claim written into minted session tokens
    #[serde(default = "default_session_issuer")]
    pub session_issuer: String,

    /// OAuth client settings for the authorization-code flow
    #[serde(default)]
    pub oauth: OAuthClientConfig,
}

fn default_pat_enabled() -> bool {
    true
}

fn default_session_issuer() -> String {
    "ado-mcp".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pat_enabled: default_pat_enabled(),
            oauth_enabled: false,
            jwt_secret: None,
            session_issuer: default_session_issuer(),
            oauth: OAuthClientConfig::default(),
        }
    }
}

/// OAuth authorization-code client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    /// Registered application (client) id
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for confidential clients
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Authorization endpoint the caller's browser is redirected to
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    /// Token endpoint used to exchange authorization codes
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Scopes requested during authorization
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Fixed callback URL; derived from the request host when unset
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

fn default_authorize_url() -> String {
    "https://login.microsoftonline.com/common/oauth2/v2.0/authorize".to_string()
}

fn default_token_url() -> String {
    "https://login.microsoftonline.com/common/oauth2/v2.0/token".to_string()
}

fn default_scopes() -> Vec<String> {
    // Azure DevOps resource id
    vec![
        "499b84ac-1321-427f-aa17-267ca6975798/.default".to_string(),
        "offline_access".to_string(),
    ]
}

impl Default for OAuthClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            scopes: default_scopes(),
            redirect_uri: None,
        }
    }
}

/// Downstream Azure DevOps API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoConfig {
    /// Base URL; the organization is appended as the first path segment
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// `api-version` query parameter sent with every call
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://dev.azure.com".to_string()
}

fn default_api_version() -> String {
    "7.1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for AdoConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_version: default_api_version(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Sync-delegation deadlines, in milliseconds
///
/// Tool invocations get the longest deadline, listing and metadata methods
/// a shorter one, and the handshake the shortest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationConfig {
    /// Deadline for `initialize`
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,

    /// Deadline for `*/list`, `prompts/get` and `ping`
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_ms: u64,

    /// Deadline for `tools/call`
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_ms: u64,

    /// Deadline for any other method
    #[serde(default = "default_delegation_timeout")]
    pub default_timeout_ms: u64,
}

fn default_handshake_timeout() -> u64 {
    1_000
}

fn default_metadata_timeout() -> u64 {
    5_000
}

fn default_tool_timeout() -> u64 {
    30_000
}

fn default_delegation_timeout() -> u64 {
    10_000
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout(),
            metadata_timeout_ms: default_metadata_timeout(),
            tool_timeout_ms: default_tool_timeout(),
            default_timeout_ms: default_delegation_timeout(),
        }
    }
}

impl DelegationConfig {
    /// Deadline applied to a delegated message with the given method
    ///
    /// # Examples
    ///
    /// ```
    /// use ado_mcp::config::DelegationConfig;
    /// use std::time::Duration;
    ///
    /// let cfg = DelegationConfig::default();
    /// assert_eq!(cfg.deadline_for("initialize"), Duration::from_millis(1_000));
    /// assert_eq!(cfg.deadline_for("tools/call"), Duration::from_millis(30_000));
    /// ```
    pub fn deadline_for(&self, method: &str) -> Duration {
        let ms = match method {
            crate::mcp::types::METHOD_INITIALIZE => self.handshake_timeout_ms,
            crate::mcp::types::METHOD_TOOLS_CALL => self.tool_timeout_ms,
            crate::mcp::types::METHOD_PING | crate::mcp::types::METHOD_PROMPTS_GET => {
                self.metadata_timeout_ms
            }
            m if m.ends_with("/list") => self.metadata_timeout_ms,
            _ => self.default_timeout_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AdoMcpError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AdoMcpError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(host) = std::env::var("ADO_MCP_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("ADO_MCP_PORT") {
            if let Ok(value) = port.parse() {
                self.server.port = value;
            } else {
                tracing::warn!("Invalid ADO_MCP_PORT: {}", port);
            }
        }

        if let Ok(secret) = std::env::var("ADO_MCP_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }

        if let Ok(enabled) = std::env::var("ADO_MCP_ENABLE_PAT") {
            match enabled.parse::<bool>() {
                Ok(v) => self.auth.pat_enabled = v,
                Err(_) => tracing::warn!("Invalid value for ADO_MCP_ENABLE_PAT: {}", enabled),
            }
        }

        if let Ok(enabled) = std::env::var("ADO_MCP_ENABLE_OAUTH") {
            match enabled.parse::<bool>() {
                Ok(v) => self.auth.oauth_enabled = v,
                Err(_) => tracing::warn!("Invalid value for ADO_MCP_ENABLE_OAUTH: {}", enabled),
            }
        }

        if let Ok(client_id) = std::env::var("ADO_MCP_OAUTH_CLIENT_ID") {
            self.auth.oauth.client_id = Some(client_id);
        }

        if let Ok(client_secret) = std::env::var("ADO_MCP_OAUTH_CLIENT_SECRET") {
            self.auth.oauth.client_secret = Some(client_secret);
        }

        if let Ok(redirect_uri) = std::env::var("ADO_MCP_OAUTH_REDIRECT_URI") {
            self.auth.oauth.redirect_uri = Some(redirect_uri);
        }

        if let Ok(api_base) = std::env::var("ADO_MCP_API_BASE") {
            tracing::debug!(api_base = %api_base, "Env override: ADO_MCP_API_BASE");
            self.ado.api_base = api_base;
        }

        if let Ok(json_logs) = std::env::var("ADO_MCP_LOG_JSON") {
            match json_logs.parse::<bool>() {
                Ok(v) => self.logging.json = v,
                Err(_) => tracing::warn!("Invalid value for ADO_MCP_LOG_JSON: {}", json_logs),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }

        let crate::cli::Commands::Serve { host, port } = &cli.command;
        if let Some(host) = host {
            self.server.host = host.clone();
        }
        if let Some(port) = port {
            self.server.port = *port;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the port or any delegation deadline is zero, if the
    /// handshake, metadata and tool deadlines are out of order, or if the
    /// federated scheme is enabled without a signing secret.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AdoMcpError::Config("server.port must be greater than 0".to_string()).into());
        }

        let d = &self.delegation;
        if d.handshake_timeout_ms == 0
            || d.metadata_timeout_ms == 0
            || d.tool_timeout_ms == 0
            || d.default_timeout_ms == 0
        {
            return Err(AdoMcpError::Config(
                "delegation timeouts must be greater than 0".to_string(),
            )
            .into());
        }

        if d.handshake_timeout_ms > d.metadata_timeout_ms || d.metadata_timeout_ms > d.tool_timeout_ms {
            return Err(AdoMcpError::Config(format!(
                "delegation timeouts must satisfy handshake ({}) <= metadata ({}) <= tool ({})",
                d.handshake_timeout_ms, d.metadata_timeout_ms, d.tool_timeout_ms
            ))
            .into());
        }

        if self.auth.oauth_enabled
            && self
                .auth
                .jwt_secret
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            return Err(AdoMcpError::Config(
                "auth.jwt_secret is required when auth.oauth_enabled is true".to_string(),
            )
            .into());
        }

        if !self.auth.pat_enabled && !self.auth.oauth_enabled {
            tracing::warn!("No authentication scheme is enabled; every MCP request will be rejected");
        }

        Ok(())
    }

    /// Whether the federated scheme has everything the OAuth flow needs
    pub fn oauth_configured(&self) -> bool {
        self.auth.oauth.client_id.is_some() && self.auth.jwt_secret.is_some()
    }
}
