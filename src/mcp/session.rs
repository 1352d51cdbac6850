//! Per-session server construction
//!
//! Every inbound connection or request gets its own [`McpServer`] built by a
//! [`SessionFactory`]. Servers are never pooled or reused, and two sessions
//! for the same caller share nothing.

use std::sync::Arc;

use crate::ado::{AdoClient, AdoClientFactory};
use crate::auth::CallerIdentity;
use crate::error::{AdoMcpError, Result};
use crate::mcp::server::{McpServer, ProtocolServer};
use crate::mcp::tools::{
    compose_user_agent, AccessToken, ClientAccessor, CredentialAccessor, ToolBindings,
    ToolConfigurator, UserAgentAccessor,
};
use crate::mcp::types::Implementation;

/// How the session's server is attached to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Persistent SSE stream
    Stream,
    /// One message, one synchronous HTTP response
    SyncDelegate,
}

impl SessionMode {
    /// Label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::SyncDelegate => "sync-delegate",
        }
    }
}

/// A server instance owned by exactly one session.
pub struct TransportSession {
    /// Attachment mode
    pub mode: SessionMode,
    /// Owning caller
    pub identity: CallerIdentity,
    /// The session's private server
    pub server: Arc<dyn ProtocolServer>,
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("mode", &self.mode)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Builds one fresh server per session.
pub trait SessionFactory: Send + Sync {
    /// Creates a session for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Session`] if a collaborator is misconfigured.
    /// The failure affects only this session.
    fn create(&self, identity: &CallerIdentity, mode: SessionMode) -> Result<TransportSession>;
}

/// Default factory wiring the Azure DevOps tools to each session.
#[derive(Clone)]
pub struct AdoSessionFactory {
    server_info: Implementation,
    clients: AdoClientFactory,
    configurator: Arc<dyn ToolConfigurator>,
}

impl AdoSessionFactory {
    /// Creates a factory.
    ///
    /// # Arguments
    ///
    /// * `server_info` - Name and version advertised in `initialize`
    /// * `clients` - Downstream client factory
    /// * `configurator` - Registers tools and prompts on each server
    pub fn new(
        server_info: Implementation,
        clients: AdoClientFactory,
        configurator: Arc<dyn ToolConfigurator>,
    ) -> Self {
        Self {
            server_info,
            clients,
            configurator,
        }
    }

    /// Builds the server and its bindings without wrapping them in a
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Session`] if the configurator fails.
    pub fn build(&self, identity: &CallerIdentity) -> Result<(McpServer, ToolBindings)> {
        let mut server = McpServer::new(self.server_info.clone()).with_instructions(format!(
            "Read-only Azure DevOps tools for the '{}' organization.",
            identity.organization()
        ));
        let bindings = self.bindings(identity, &server);

        self.configurator
            .configure(&mut server, &bindings)
            .map_err(|e| AdoMcpError::Session(format!("tool configuration failed: {}", e)))?;

        Ok((server, bindings))
    }

    fn bindings(&self, identity: &CallerIdentity, server: &McpServer) -> ToolBindings {
        let token = identity.token().to_string();
        let expires_on = identity.expires_on();
        let credential: CredentialAccessor = Arc::new(move || AccessToken {
            token: token.clone(),
            expires_on,
        });

        // Reads the peer slot on every call, so the string picks up the
        // client info once the handshake has happened.
        let peer = server.peer_info_handle();
        let name = self.server_info.name.clone();
        let version = self.server_info.version.clone();
        let user_agent: UserAgentAccessor =
            Arc::new(move || compose_user_agent(&name, &version, peer.get()));

        let clients = self.clients.clone();
        let organization = identity.organization().to_string();
        let ado_credential = identity.ado_credential();
        let agent = Arc::clone(&user_agent);
        let client: ClientAccessor = Arc::new(move || -> Result<AdoClient> {
            Ok(clients.create(&organization, ado_credential.clone(), &agent()))
        });

        ToolBindings {
            credential,
            client,
            user_agent,
        }
    }
}

impl std::fmt::Debug for AdoSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdoSessionFactory")
            .field("server_info", &self.server_info)
            .finish_non_exhaustive()
    }
}

impl SessionFactory for AdoSessionFactory {
    fn create(&self, identity: &CallerIdentity, mode: SessionMode) -> Result<TransportSession> {
        let (server, _) = self.build(identity)?;
        tracing::debug!(
            organization = %identity.organization(),
            scheme = %identity.scheme(),
            mode = mode.as_str(),
            "Session created"
        );
        Ok(TransportSession {
            mode,
            identity: identity.clone(),
            server: Arc::new(server),
        })
    }
}
