//! Test utilities for the ADO MCP server
//!
//! Temporary files, assertion helpers, canned configuration and identities,
//! and [`ScriptedServer`], a protocol server whose behavior is fixed up
//! front.

use crate::auth::{AuthScheme, CallerIdentity};
use crate::config::Config;
use crate::error::{AdoMcpError, Result};
use crate::mcp::server::ProtocolServer;
use crate::mcp::transport::Transport;
use crate::mcp::types::JsonRpcMessage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::RwLock;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Configuration with both schemes enabled and a signing secret
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.pat_enabled = true;
    config.auth.oauth_enabled = true;
    config.auth.jwt_secret = Some("test-secret".to_string());
    config.auth.oauth.client_id = Some("client-id".to_string());
    config
}

/// A YAML rendering of a complete configuration
pub fn test_config_yaml() -> String {
    r#"
server:
  host: 0.0.0.0
  port: 8080
  name: ado-mcp-test

auth:
  pat_enabled: true
  oauth_enabled: true
  jwt_secret: yaml-secret
  oauth:
    client_id: yaml-client
    scopes:
      - 499b84ac-1321-427f-aa17-267ca6975798/.default

ado:
  api_base: https://dev.azure.com
  api_version: "7.1"
  request_timeout_seconds: 15

delegation:
  handshake_timeout_ms: 500
  metadata_timeout_ms: 2000
  tool_timeout_ms: 20000
  default_timeout_ms: 5000

logging:
  level: debug
  json: true
"#
    .to_string()
}

/// A credential-token identity for `organization`
pub fn test_identity(organization: &str) -> CallerIdentity {
    CallerIdentity::new(AuthScheme::CredentialToken, "test-pat", organization)
        .expect("valid test identity")
}

/// What a [`ScriptedServer`] does with the message it is handed.
#[derive(Debug, Clone)]
pub enum ServerScript {
    /// Send each value in order
    Reply(Vec<serde_json::Value>),
    /// Send a value, then report a transport error
    ReplyAndError(serde_json::Value, String),
    /// Return immediately without output
    Silent,
    /// Never return
    Hang,
    /// Fail without output
    Fail(String),
}

/// Protocol server with scripted behavior.
#[derive(Debug)]
pub struct ScriptedServer {
    script: ServerScript,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    closed: AtomicBool,
}

impl ScriptedServer {
    /// Create a server that follows `script`
    pub fn new(script: ServerScript) -> Self {
        Self {
            script,
            transport: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProtocolServer for ScriptedServer {
    async fn connect(&self, transport: Arc<dyn Transport>) -> Result<()> {
        *self.transport.write().await = Some(transport);
        Ok(())
    }

    async fn handle_message(&self, _message: JsonRpcMessage) -> Result<()> {
        let transport = self
            .transport
            .read()
            .await
            .clone()
            .ok_or_else(|| AdoMcpError::Transport("not connected".to_string()))?;

        match &self.script {
            ServerScript::Reply(values) => {
                for value in values {
                    transport.send(value.clone()).await?;
                }
                Ok(())
            }
            ServerScript::ReplyAndError(value, error) => {
                transport.send(value.clone()).await?;
                transport.report_error(error.clone());
                Ok(())
            }
            ServerScript::Silent => Ok(()),
            ServerScript::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            ServerScript::Fail(message) => Err(anyhow::anyhow!(message.clone())),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(transport) = self.transport.write().await.take() {
            transport.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[tokio::test]
    async fn test_scripted_server_closes_its_transport() {
        let server = ScriptedServer::new(ServerScript::Silent);
        let capture = Arc::new(crate::mcp::transport::capture::CaptureTransport::new());
        server.connect(capture.clone()).await.unwrap();
        server.close().await.unwrap();
        assert!(server.is_closed());
        assert!(capture.is_closed());
    }
}
