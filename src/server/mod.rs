//! HTTP server
//!
//! - `routes`  -- axum router and handlers
//! - `streams` -- registry of live SSE stream sessions
//!
//! [`AppState`] is built once from the validated [`Config`] and cloned into
//! every handler; everything in it is read-only or internally synchronized.

pub mod routes;
pub mod streams;

use std::sync::Arc;
use std::time::Duration;

use crate::ado::AdoClientFactory;
use crate::auth::{CredentialValidator, OAuthExchange};
use crate::config::Config;
use crate::error::{AdoMcpError, Result};
use crate::mcp::delegate::SyncDelegationAdapter;
use crate::mcp::session::{AdoSessionFactory, SessionFactory};
use crate::mcp::tools::{compose_user_agent, AdoToolConfigurator};
use crate::mcp::types::Implementation;

pub use routes::build_router;
pub use streams::StreamRegistry;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Immutable process configuration
    pub config: Arc<Config>,
    /// Credential validation for the auth gateway
    pub validator: Arc<CredentialValidator>,
    /// OAuth authorization-code exchange
    pub oauth: Arc<OAuthExchange>,
    /// Builds one server per session
    pub sessions: Arc<dyn SessionFactory>,
    /// Single-shot delegation
    pub delegation: SyncDelegationAdapter,
    /// Live stream sessions
    pub streams: Arc<StreamRegistry>,
    /// Name and version advertised to clients
    pub server_info: Implementation,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server_info", &self.server_info)
            .field("delegation", &self.delegation)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wires every component from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the downstream API base is invalid or an HTTP
    /// client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let server_info = Implementation {
            name: config.server.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some("Azure DevOps MCP server".to_string()),
        };

        let clients = AdoClientFactory::new(&config.ado)?;
        let user_agent = compose_user_agent(&server_info.name, &server_info.version, None);
        let validator = CredentialValidator::new(&config.auth, clients.clone(), user_agent);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ado.request_timeout_seconds))
            .build()?;
        let oauth = OAuthExchange::new(&config, http);

        let sessions = AdoSessionFactory::new(
            server_info.clone(),
            clients,
            Arc::new(AdoToolConfigurator),
        );

        Ok(Self {
            delegation: SyncDelegationAdapter::new(config.delegation.clone()),
            config: Arc::new(config),
            validator: Arc::new(validator),
            oauth: Arc::new(oauth),
            sessions: Arc::new(sessions),
            streams: Arc::new(StreamRegistry::new()),
            server_info,
        })
    }

    /// Replaces the session factory.
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionFactory>) -> Self {
        self.sessions = sessions;
        self
    }
}

/// Runs the HTTP server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the state cannot be built or the listener cannot
/// bind.
pub async fn serve(config: Config) -> Result<()> {
    let address = config.server.bind_address();
    let state = AppState::new(config)?;
    let auth = &state.config.auth;
    tracing::info!(
        address = %address,
        pat_enabled = auth.pat_enabled,
        oauth_enabled = auth.oauth_enabled,
        "Starting ADO MCP server"
    );

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| AdoMcpError::Config(format!("Failed to bind {}: {}", address, e)))?;

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
