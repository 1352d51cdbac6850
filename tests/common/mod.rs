#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use chrono::Utc;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::sync::RwLock;

use ado_mcp::auth::jwt::{issue_session_token, SessionClaims};
use ado_mcp::auth::CallerIdentity;
use ado_mcp::config::Config;
use ado_mcp::error::{AdoMcpError, Result};
use ado_mcp::mcp::server::ProtocolServer;
use ado_mcp::mcp::session::{SessionFactory, SessionMode, TransportSession};
use ado_mcp::mcp::transport::Transport;
use ado_mcp::mcp::types::JsonRpcMessage;

pub const SECRET: &str = "integration-secret";

pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Both schemes on, downstream API at `api_base`.
pub fn config(api_base: &str) -> Config {
    let mut config = Config::default();
    config.auth.pat_enabled = true;
    config.auth.oauth_enabled = true;
    config.auth.jwt_secret = Some(SECRET.to_string());
    config.auth.oauth.client_id = Some("client-id".to_string());
    config.ado.api_base = api_base.to_string();
    config
}

/// A federated session token for `organization`.
pub fn session_token(secret: &str, organization: &str) -> String {
    let now = Utc::now().timestamp();
    issue_session_token(
        secret,
        &SessionClaims {
            sub: "user-1".to_string(),
            access_token: format!("downstream-{}", organization),
            organization: Some(organization.to_string()),
            iat: now,
            exp: now + 600,
            iss: Some("ado-mcp".to_string()),
        },
    )
    .expect("sign session token")
}

pub fn post(uri: &str, token: Option<&str>, org: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    if let Some(org) = org {
        builder = builder.header("x-ado-organization", org);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8_lossy(&bytes).to_string()
}

/// Reads SSE events from a streaming response body.
pub struct EventReader {
    stream: axum::body::BodyDataStream,
    buffer: String,
}

impl EventReader {
    pub fn new(response: Response<Body>) -> Self {
        Self {
            stream: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Next `(event, data)` pair, skipping keep-alive comments.
    pub async fn next_event(&mut self) -> Option<(String, String)> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                let mut event = String::from("message");
                let mut data = Vec::new();
                for line in block.lines() {
                    if let Some(v) = line.strip_prefix("event:") {
                        event = v.trim().to_string();
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data.push(v.trim_start().to_string());
                    }
                }
                if data.is_empty() {
                    continue;
                }
                return Some((event, data.join("\n")));
            }
            let chunk = self.stream.next().await?.ok()?;
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

/// Server that answers every request with its owner's organization.
#[derive(Debug)]
pub struct TaggedServer {
    organization: String,
    handled: Arc<AtomicUsize>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
}

#[async_trait::async_trait]
impl ProtocolServer for TaggedServer {
    async fn connect(&self, transport: Arc<dyn Transport>) -> Result<()> {
        *self.transport.write().await = Some(transport);
        Ok(())
    }

    async fn handle_message(&self, message: JsonRpcMessage) -> Result<()> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        let JsonRpcMessage::Request(request) = message else {
            return Ok(());
        };
        if request.method == "hang" {
            std::future::pending::<()>().await;
        }
        let transport = self
            .transport
            .read()
            .await
            .clone()
            .ok_or_else(|| AdoMcpError::Transport("not connected".to_string()))?;
        transport
            .send(serde_json::json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "result": {"organization": self.organization, "method": request.method},
            }))
            .await
    }

    async fn close(&self) -> Result<()> {
        if let Some(transport) = self.transport.write().await.take() {
            transport.close().await;
        }
        Ok(())
    }
}

/// Session factory that counts what it builds and what its servers handle.
#[derive(Debug, Default)]
pub struct SpyFactory {
    pub created: AtomicUsize,
    pub handled: Arc<AtomicUsize>,
    pub fail: bool,
}

impl SpyFactory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }
}

impl SessionFactory for SpyFactory {
    fn create(&self, identity: &CallerIdentity, mode: SessionMode) -> Result<TransportSession> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AdoMcpError::Session("collaborator misconfigured".to_string()).into());
        }
        Ok(TransportSession {
            mode,
            identity: identity.clone(),
            server: Arc::new(TaggedServer {
                organization: identity.organization().to_string(),
                handled: Arc::clone(&self.handled),
                transport: RwLock::new(None),
            }),
        })
    }
}
