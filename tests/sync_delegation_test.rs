//! Single-shot POST /mcp integration tests
//!
//! Authenticated with session tokens so no downstream API is needed; the
//! spy factory's servers echo their owner's organization.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tower::ServiceExt;

use ado_mcp::config::Config;
use ado_mcp::mcp::delegate::{DelegationOutcome, SyncDelegationAdapter};
use ado_mcp::mcp::server::ProtocolServer;
use ado_mcp::mcp::session::{SessionFactory, SessionMode};
use ado_mcp::mcp::types::{
    JsonRpcMessage, INVALID_REQUEST, LATEST_PROTOCOL_VERSION, PARSE_ERROR, REQUEST_TIMEOUT,
};
use ado_mcp::{build_router, AppState, AuthScheme, CallerIdentity};

use common::{body_json, body_text, config, post, session_token, SpyFactory, SECRET};

fn app_with(cfg: Config, spy: &Arc<SpyFactory>) -> axum::Router {
    build_router(AppState::new(cfg).unwrap().with_sessions(spy.clone()))
}

fn app(spy: &Arc<SpyFactory>) -> axum::Router {
    app_with(config("http://127.0.0.1:9"), spy)
}

fn token() -> String {
    session_token(SECRET, "contoso")
}

#[tokio::test]
async fn test_request_returns_first_reply() {
    let spy = Arc::new(SpyFactory::default());
    let response = app(&spy)
        .oneshot(post(
            "/mcp",
            Some(&token()),
            None,
            r#"{"jsonrpc":"2.0","id":"abc","method":"tools/list"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], "abc");
    assert_eq!(body["result"]["method"], "tools/list");
    assert_eq!(spy.created(), 1);
}

/// Notifications get 204 with an empty body, not a null result.
#[tokio::test]
async fn test_notification_is_no_content() {
    let spy = Arc::new(SpyFactory::default());
    let response = app(&spy)
        .oneshot(post(
            "/mcp",
            Some(&token()),
            None,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_text(response).await.is_empty());
    assert_eq!(spy.handled(), 1);
}

/// An empty body is an implicit handshake answered without delegation.
#[tokio::test]
async fn test_empty_body_is_implicit_handshake() {
    for body in ["", "{}"] {
        let spy = Arc::new(SpyFactory::default());
        let response = app(&spy)
            .oneshot(post("/mcp", Some(&token()), None, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["result"]["protocolVersion"], LATEST_PROTOCOL_VERSION);
        assert_eq!(json["result"]["serverInfo"]["name"], "ado-mcp");
        assert!(json["result"]["capabilities"]["tools"].is_object());
        assert_eq!(spy.created(), 0);
        assert_eq!(spy.handled(), 0);
    }
}

#[tokio::test]
async fn test_invalid_json_is_http_400_parse_error() {
    let spy = Arc::new(SpyFactory::default());
    let response = app(&spy)
        .oneshot(post("/mcp", Some(&token()), None, "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["jsonrpc"], "2.0");
    assert!(body["id"].is_null());
    assert_eq!(body["error"]["code"], PARSE_ERROR);
    assert_eq!(spy.created(), 0);
}

/// Well-formed JSON that is not a message gets an error envelope, not a 400.
#[tokio::test]
async fn test_non_message_json_is_invalid_request_with_id() {
    let spy = Arc::new(SpyFactory::default());
    let app = app(&spy);

    let response = app
        .clone()
        .oneshot(post("/mcp", Some(&token()), None, r#"{"jsonrpc":"2.0","id":5}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 5);
    assert_eq!(body["error"]["code"], INVALID_REQUEST);

    let response = app
        .oneshot(post("/mcp", Some(&token()), None, "[1, 2]"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["id"].is_null());
    assert_eq!(body["error"]["code"], INVALID_REQUEST);
    assert_eq!(spy.created(), 0);
}

/// A request nobody answers times out carrying its own id.
#[tokio::test]
async fn test_unanswered_request_times_out_with_id() {
    let mut cfg = config("http://127.0.0.1:9");
    cfg.delegation.default_timeout_ms = 50;
    let spy = Arc::new(SpyFactory::default());

    let response = app_with(cfg, &spy)
        .oneshot(post(
            "/mcp",
            Some(&token()),
            None,
            r#"{"jsonrpc":"2.0","id":42,"method":"hang"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 42);
    assert_eq!(body["error"]["code"], REQUEST_TIMEOUT);
}

/// A broken collaborator fails this request only.
#[tokio::test]
async fn test_session_construction_failure_is_contained() {
    let failing = Arc::new(SpyFactory::failing());
    let response = app(&failing)
        .oneshot(post(
            "/mcp",
            Some(&token()),
            None,
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(response).await["error"].is_string());

    let healthy = Arc::new(SpyFactory::default());
    let response = app(&healthy)
        .oneshot(post(
            "/mcp",
            Some(&token()),
            None,
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Two sessions for the same caller never share a server.
#[tokio::test]
async fn test_each_request_gets_a_fresh_session() {
    let spy = Arc::new(SpyFactory::default());
    let app = app(&spy);
    for id in 0..3 {
        let body = format!(r#"{{"jsonrpc":"2.0","id":{},"method":"ping"}}"#, id);
        let response = app
            .clone()
            .oneshot(post("/mcp", Some(&token()), None, &body))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["id"], id);
    }
    assert_eq!(spy.created(), 3);
}

#[tokio::test]
async fn test_adapter_null_result_differs_from_no_response() {
    let spy = SpyFactory::default();
    let identity = CallerIdentity::new(AuthScheme::CredentialToken, "pat", "contoso").unwrap();
    let adapter = SyncDelegationAdapter::default();

    let session = spy.create(&identity, SessionMode::SyncDelegate).unwrap();
    let server: Arc<dyn ProtocolServer> = session.server;
    let outcome = adapter
        .delegate_with_deadline(
            server,
            JsonRpcMessage::parse(r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#).unwrap(),
            Duration::from_millis(200),
        )
        .await;
    assert_eq!(outcome, DelegationOutcome::NoResponse);

    let session = spy.create(&identity, SessionMode::SyncDelegate).unwrap();
    let outcome = adapter
        .delegate_with_deadline(
            session.server,
            JsonRpcMessage::parse(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap(),
            Duration::from_millis(200),
        )
        .await;
    assert!(matches!(outcome, DelegationOutcome::Reply(_)));
}
