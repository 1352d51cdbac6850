//! HTTP routes
//!
//! | Route                | Auth | Purpose                                  |
//! |----------------------|------|------------------------------------------|
//! | `GET /health`        | no   | liveness                                 |
//! | `GET /info`          | no   | capability summary                       |
//! | `GET /auth/oauth`    | no   | start the authorization-code flow        |
//! | `GET /auth/callback` | no   | finish it and mint a session token       |
//! | `GET /mcp`           | yes  | open an SSE stream                       |
//! | `POST /mcp`          | yes  | single-shot message, or stream delivery  |
//! | `DELETE /mcp`        | yes  | close a stream session                   |

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::Instrument;

use crate::auth::gateway::require_identity;
use crate::auth::CallerIdentity;
use crate::error::{AuthFailure, ProtocolFailure};
use crate::mcp::delegate::{implicit_handshake, DelegationOutcome};
use crate::mcp::session::SessionMode;
use crate::mcp::tools::{DEFAULT_PROMPT_NAMES, DEFAULT_TOOL_NAMES};
use crate::mcp::transport::sse::SseStream;
use crate::mcp::types::{
    JsonRpcError, JsonRpcMessage, JsonRpcResponse, LATEST_PROTOCOL_VERSION,
    SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::server::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", get(open_stream).post(post_message).delete(close_stream))
        .route_layer(middleware::from_fn_with_state(
            state.validator.clone(),
            require_identity,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/auth/oauth", get(oauth_initiate))
        .route("/auth/callback", get(oauth_callback))
        .merge(protected)
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}

async fn request_span(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path()
    );
    next.run(request).instrument(span).await
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn parse_error_response(failure: ProtocolFailure) -> Response {
    let envelope = JsonRpcResponse::failure(serde_json::Value::Null, JsonRpcError::from(failure));
    (StatusCode::BAD_REQUEST, Json(envelope.to_value())).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

// ---------------------------------------------------------------------------
// Public endpoints
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn info(State(state): State<AppState>) -> impl IntoResponse {
    let auth = &state.config.auth;
    Json(serde_json::json!({
        "name": state.server_info.name,
        "version": state.server_info.version,
        "protocolVersion": LATEST_PROTOCOL_VERSION,
        "supportedProtocolVersions": SUPPORTED_PROTOCOL_VERSIONS,
        "transports": ["sse", "http"],
        "auth": {
            "pat": auth.pat_enabled,
            "oauth": auth.oauth_enabled,
            "oauthConfigured": state.config.oauth_configured(),
        },
        "capabilities": {
            "tools": DEFAULT_TOOL_NAMES,
            "prompts": DEFAULT_PROMPT_NAMES,
        },
    }))
}

#[derive(Debug, Deserialize)]
struct InitiateQuery {
    organization: Option<String>,
    redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    redirect_uri: Option<String>,
}

/// Redirect URI registered for this server: configured, else derived from
/// the `Host` the caller used.
fn callback_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(uri) = &state.config.auth.oauth.redirect_uri {
        return uri.clone();
    }
    let host = header_str(headers, header::HOST)
        .map(str::to_string)
        .unwrap_or_else(|| state.config.server.bind_address());
    format!("http://{}/auth/callback", host)
}

async fn oauth_initiate(
    State(state): State<AppState>,
    Query(query): Query<InitiateQuery>,
    headers: HeaderMap,
) -> Response {
    if !state.config.auth.oauth_enabled {
        return AuthFailure::NotEnabled.into_response();
    }
    let callback = query
        .redirect_uri
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| callback_url(&state, &headers));

    match state
        .oauth
        .initiate(query.organization.as_deref().unwrap_or_default(), &callback)
    {
        Ok(url) => Json(serde_json::json!({ "authUrl": url })).into_response(),
        Err(failure) => failure.into_response(),
    }
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Response {
    if !state.config.auth.oauth_enabled {
        return AuthFailure::NotEnabled.into_response();
    }
    // Must repeat the redirect URI the authorize step used.
    let callback = query
        .redirect_uri
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| callback_url(&state, &headers));
    match state
        .oauth
        .complete(
            query.code.as_deref().unwrap_or_default(),
            query.state.as_deref().unwrap_or_default(),
            &callback,
        )
        .await
    {
        Ok(grant) => Json(grant).into_response(),
        Err(failure) => failure.into_response(),
    }
}

// ---------------------------------------------------------------------------
// Protocol endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

fn sse_response(stream: SseStream) -> Response {
    let mut response = Sse::new(stream.into_events())
        .keep_alive(KeepAlive::default())
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// Whether a POST asks for the persistent stream instead of one reply.
fn wants_stream(headers: &HeaderMap) -> bool {
    if header_str(headers, header::UPGRADE).is_some_and(|u| u.eq_ignore_ascii_case("sse")) {
        return true;
    }
    header_str(headers, header::ACCEPT).is_some_and(|accept| {
        accept.contains("text/event-stream") && !accept.contains("application/json")
    })
}

/// Why a POST body could not be turned into a message.
#[derive(Debug)]
enum BodyError {
    /// Not JSON at all; answered with HTTP 400
    Parse(ProtocolFailure),
    /// JSON, but not a JSON-RPC message; answered with an error envelope
    Invalid {
        id: serde_json::Value,
        failure: ProtocolFailure,
    },
}

impl IntoResponse for BodyError {
    fn into_response(self) -> Response {
        match self {
            Self::Parse(failure) => parse_error_response(failure),
            Self::Invalid { id, failure } => {
                let envelope = JsonRpcResponse::failure(id, JsonRpcError::from(failure));
                Json(envelope.to_value()).into_response()
            }
        }
    }
}

/// Parses a POST body. `Ok(None)` means the body was empty or `{}`.
fn parse_body(body: &str) -> Result<Option<JsonRpcMessage>, BodyError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| BodyError::Parse(ProtocolFailure::ParseError(e.to_string())))?;
    if value.as_object().is_some_and(|o| o.is_empty()) {
        return Ok(None);
    }
    let id = JsonRpcMessage::recoverable_id(&value);
    JsonRpcMessage::from_value(value)
        .map(Some)
        .map_err(|failure| BodyError::Invalid { id, failure })
}

async fn open_stream(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
) -> Response {
    open_stream_with(&state, &identity, None).await
}

async fn open_stream_with(
    state: &AppState,
    identity: &CallerIdentity,
    first: Option<JsonRpcMessage>,
) -> Response {
    let session = match state.sessions.create(identity, SessionMode::Stream) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(organization = %identity.organization(), error = %e, "Session construction failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session");
        }
    };

    let (id, stream) = match state.streams.open(session).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!(organization = %identity.organization(), error = %e, "Stream open failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to open stream");
        }
    };

    if let Some(message) = first {
        if let Err(e) = state
            .streams
            .deliver(&id, identity.organization(), message)
            .await
        {
            tracing::warn!(connection_id = %id, error = %e, "First message not delivered");
        }
    }

    sse_response(stream)
}

async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Extension(identity): Extension<CallerIdentity>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let message = match parse_body(&body) {
        Ok(message) => message,
        Err(error) => {
            tracing::debug!(error = ?error, "Rejected message body");
            return error.into_response();
        }
    };

    if let Some(id) = query.session_id {
        let Some(message) = message else {
            return error_response(StatusCode::BAD_REQUEST, "Empty message");
        };
        return match state
            .streams
            .deliver(&id, identity.organization(), message)
            .await
        {
            Ok(()) => StatusCode::ACCEPTED.into_response(),
            Err(_) => error_response(StatusCode::NOT_FOUND, "Unknown session"),
        };
    }

    if wants_stream(&headers) {
        return open_stream_with(&state, &identity, message).await;
    }

    let Some(message) = message else {
        return Json(implicit_handshake(&state.server_info)).into_response();
    };

    let session = match state.sessions.create(&identity, SessionMode::SyncDelegate) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(organization = %identity.organization(), error = %e, "Session construction failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session");
        }
    };

    match state.delegation.delegate(session.server, message).await {
        DelegationOutcome::Reply(body) => Json(body).into_response(),
        DelegationOutcome::NoResponse => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn close_stream(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Extension(identity): Extension<CallerIdentity>,
) -> Response {
    let Some(id) = query.session_id else {
        return error_response(StatusCode::BAD_REQUEST, "Missing sessionId");
    };
    match state.streams.close(&id, identity.organization()).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "Unknown session"),
    }
}
