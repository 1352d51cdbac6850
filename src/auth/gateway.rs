//! Authentication gateway middleware
//!
//! [`require_identity`] runs in front of every protocol-bearing route. It
//! reads `Authorization: Bearer <token>` and the `x-ado-organization`
//! header, resolves a [`CallerIdentity`] through the
//! [`CredentialValidator`], and stores it in the request extensions. On any
//! failure the request is answered immediately and the protocol layer is
//! never reached.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::validator::CredentialValidator;
use crate::error::AuthFailure;
use crate::metrics::record_auth_attempt;

/// Header carrying the caller's organization.
pub const ORGANIZATION_HEADER: &str = "x-ado-organization";

/// Extracts the bearer token from `Authorization`.
///
/// The scheme name is matched case-insensitively.
///
/// # Errors
///
/// Returns [`AuthFailure::MissingOrMalformed`] if the header is absent, not
/// valid ASCII, not a Bearer credential, or carries an empty token.
///
/// # Examples
///
/// ```
/// use axum::http::HeaderMap;
/// use ado_mcp::auth::gateway::extract_bearer;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", "Bearer abc".parse().unwrap());
/// assert_eq!(extract_bearer(&headers).unwrap(), "abc");
///
/// headers.insert("authorization", "Basic abc".parse().unwrap());
/// assert!(extract_bearer(&headers).is_err());
/// ```
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthFailure::MissingOrMalformed)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthFailure::MissingOrMalformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthFailure::MissingOrMalformed);
    }
    Ok(token)
}

/// Reads the out-of-band organization header, if non-blank.
pub fn declared_organization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ORGANIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Middleware resolving the caller before any protocol handling.
///
/// On success the [`crate::auth::CallerIdentity`] is available to handlers
/// through `Extension<CallerIdentity>`.
pub async fn require_identity(
    State(validator): State<Arc<CredentialValidator>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Owned copies: the request body is not `Sync`, so no borrow of the
    // request may be held across the validation await.
    let token = match extract_bearer(request.headers()) {
        Ok(token) => token.to_string(),
        Err(failure) => {
            tracing::debug!(path = %request.uri().path(), "Rejected request without bearer token");
            record_auth_attempt("none", failure.code());
            return failure.into_response();
        }
    };
    let organization = declared_organization(request.headers()).map(str::to_string);

    match validator
        .validate(&token, organization.as_deref())
        .await
    {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(failure) => {
            tracing::info!(code = failure.code(), "Authentication failed");
            failure.into_response()
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response();
        if status == axum::http::StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"ado-mcp\""),
            );
        }
        response
    }
}
