//! OAuth authorization-code exchange
//!
//! Two stateless operations back the federated scheme:
//!
//! - [`OAuthExchange::initiate`] composes the authorization URL. The
//!   organization rides through the redirect inside the opaque `state`
//!   value (base64url JSON `{"organization": ...}`), so no server-side
//!   storage is needed.
//! - [`OAuthExchange::complete`] trades the returned code for a downstream
//!   access token and mints a session token wrapping it.

use std::collections::HashMap;

use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::jwt::{issue_session_token, SessionClaims};
use crate::config::Config;
use crate::error::{AuthFailure, ExchangeFailure};
use crate::metrics::record_oauth_exchange;

/// Lifetime used when the token endpoint reports none.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Payload carried in the `state` round-trip value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    /// Organization chosen when the flow started
    pub organization: String,
}

impl OAuthState {
    /// Encodes as unpadded base64url JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use ado_mcp::auth::oauth::OAuthState;
    ///
    /// let state = OAuthState { organization: "contoso".to_string() };
    /// let encoded = state.encode();
    /// assert_eq!(OAuthState::decode(&encoded).unwrap(), state);
    /// ```
    pub fn encode(&self) -> String {
        let json = serde_json::json!({ "organization": self.organization }).to_string();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a `state` value.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeFailure::InvalidState`] if the value is not base64url
    /// JSON with a non-empty `organization`.
    pub fn decode(state: &str) -> Result<Self, ExchangeFailure> {
        let bytes = URL_SAFE_NO_PAD
            .decode(state.trim_end_matches('='))
            .map_err(|_| ExchangeFailure::InvalidState)?;
        let decoded: Self =
            serde_json::from_slice(&bytes).map_err(|_| ExchangeFailure::InvalidState)?;
        if decoded.organization.trim().is_empty() {
            return Err(ExchangeFailure::InvalidState);
        }
        Ok(decoded)
    }
}

/// Result of a completed exchange, returned to the caller as JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
    /// Federated session token to present as `Authorization: Bearer`
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: u64,
    /// Organization the session is scoped to
    pub organization: String,
}

impl std::fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGrant")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("organization", &self.organization)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Authorization-code exchange for the federated scheme.
#[derive(Debug, Clone)]
pub struct OAuthExchange {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    authorize_url: String,
    token_url: String,
    scopes: Vec<String>,
    jwt_secret: Option<String>,
    issuer: String,
}

impl OAuthExchange {
    /// Builds the exchange from configuration.
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        let oauth = &config.auth.oauth;
        Self {
            http,
            client_id: oauth.client_id.clone().filter(|s| !s.is_empty()),
            client_secret: oauth.client_secret.clone().filter(|s| !s.is_empty()),
            authorize_url: oauth.authorize_url.clone(),
            token_url: oauth.token_url.clone(),
            scopes: oauth.scopes.clone(),
            jwt_secret: config.auth.jwt_secret.clone().filter(|s| !s.is_empty()),
            issuer: config.auth.session_issuer.clone(),
        }
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.client_id.as_deref()?, self.jwt_secret.as_deref()?))
    }

    /// Composes the authorization URL for `organization`.
    ///
    /// # Arguments
    ///
    /// * `organization` - Organization the resulting session is scoped to
    /// * `callback_url` - Redirect URI registered for this server
    ///
    /// # Errors
    ///
    /// - [`AuthFailure::MissingOrganization`] for a blank organization
    /// - [`AuthFailure::NotConfigured`] if the client id or signing secret is
    ///   absent, or the authorize URL is invalid
    pub fn initiate(&self, organization: &str, callback_url: &str) -> Result<String, AuthFailure> {
        let organization = organization.trim();
        if organization.is_empty() {
            return Err(AuthFailure::MissingOrganization);
        }
        let (client_id, _) = self.credentials().ok_or(AuthFailure::NotConfigured)?;

        let mut url = Url::parse(&self.authorize_url).map_err(|e| {
            tracing::error!(error = %e, "Invalid auth.oauth.authorize_url");
            AuthFailure::NotConfigured
        })?;

        let state = OAuthState {
            organization: organization.to_string(),
        }
        .encode();

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", client_id);
            query.append_pair("response_type", "code");
            query.append_pair("redirect_uri", callback_url);
            query.append_pair("response_mode", "query");
            if !self.scopes.is_empty() {
                query.append_pair("scope", &self.scopes.join(" "));
            }
            query.append_pair("state", &state);
        }

        tracing::info!(organization, "OAuth flow initiated");
        Ok(url.to_string())
    }

    /// Exchanges `code` for a downstream token and mints a session token.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from the callback
    /// * `state` - `state` value from the callback
    /// * `callback_url` - The same redirect URI used by [`Self::initiate`]
    ///
    /// # Errors
    ///
    /// Returns an [`ExchangeFailure`]; no partial state survives a failure.
    pub async fn complete(
        &self,
        code: &str,
        state: &str,
        callback_url: &str,
    ) -> Result<SessionGrant, ExchangeFailure> {
        let result = self.exchange(code, state, callback_url).await;
        match &result {
            Ok(grant) => {
                tracing::info!(organization = %grant.organization, "OAuth exchange completed");
                record_oauth_exchange("success");
            }
            Err(failure) => {
                tracing::warn!(code = failure.code(), error = %failure, "OAuth exchange failed");
                record_oauth_exchange(failure.code());
            }
        }
        result
    }

    async fn exchange(
        &self,
        code: &str,
        state: &str,
        callback_url: &str,
    ) -> Result<SessionGrant, ExchangeFailure> {
        if code.trim().is_empty() {
            return Err(ExchangeFailure::MissingCode);
        }
        let OAuthState { organization } = OAuthState::decode(state)?;
        let (client_id, secret) = self.credentials().ok_or(ExchangeFailure::NotConfigured)?;

        let scope = self.scopes.join(" ");
        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("client_id", client_id);
        params.insert("code", code);
        params.insert("redirect_uri", callback_url);
        if !scope.is_empty() {
            params.insert("scope", &scope);
        }
        if let Some(client_secret) = self.client_secret.as_deref() {
            params.insert("client_secret", client_secret);
        }

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ExchangeFailure::ExchangeFailed(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(ExchangeFailure::ExchangeFailed(format!(
                "token endpoint returned {}",
                resp.status()
            )));
        }

        let token: TokenResponse = resp.json().await.map_err(|e| {
            ExchangeFailure::ExchangeFailed(format!("failed to parse token response: {e}"))
        })?;
        if token.access_token.is_empty() {
            return Err(ExchangeFailure::ExchangeFailed(
                "token endpoint returned an empty access token".to_string(),
            ));
        }

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: token
                .id_token
                .as_deref()
                .and_then(subject_from_id_token)
                .unwrap_or_else(|| "unknown".to_string()),
            access_token: token.access_token,
            organization: Some(organization.clone()),
            iat: now,
            exp: now.saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX)),
            iss: Some(self.issuer.clone()),
        };

        let session_token = issue_session_token(secret, &claims)
            .map_err(|e| ExchangeFailure::ExchangeFailed(format!("failed to sign session: {e}")))?;

        Ok(SessionGrant {
            token: session_token,
            expires_in,
            organization,
        })
    }
}

/// Reads `sub` (or `oid`) from an identity token's payload.
///
/// The identity token arrived directly from the token endpoint over TLS, so
/// only its payload is decoded.
fn subject_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("sub")
        .or_else(|| claims.get("oid"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

impl IntoResponse for ExchangeFailure {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(client_id: Option<&str>, secret: Option<&str>) -> OAuthExchange {
        let mut config = Config::default();
        config.auth.oauth.client_id = client_id.map(str::to_string);
        config.auth.jwt_secret = secret.map(str::to_string);
        config.auth.oauth.authorize_url = "https://login.example.com/authorize".to_string();
        OAuthExchange::new(&config, reqwest::Client::new())
    }

    #[test]
    fn test_state_rejects_garbage() {
        assert_eq!(
            OAuthState::decode("!!not-base64!!").unwrap_err(),
            ExchangeFailure::InvalidState
        );
        let not_json = URL_SAFE_NO_PAD.encode("hello");
        assert!(OAuthState::decode(&not_json).is_err());
        let blank = URL_SAFE_NO_PAD.encode(r#"{"organization":""}"#);
        assert!(OAuthState::decode(&blank).is_err());
    }

    #[test]
    fn test_initiate_requires_configuration() {
        let unconfigured = exchange(None, Some("s"));
        assert_eq!(
            unconfigured.initiate("contoso", "http://localhost/cb").unwrap_err(),
            AuthFailure::NotConfigured
        );
        let no_secret = exchange(Some("client"), None);
        assert_eq!(
            no_secret.initiate("contoso", "http://localhost/cb").unwrap_err(),
            AuthFailure::NotConfigured
        );
    }

    #[test]
    fn test_initiate_requires_organization() {
        let ex = exchange(Some("client"), Some("s"));
        assert_eq!(
            ex.initiate(" ", "http://localhost/cb").unwrap_err(),
            AuthFailure::MissingOrganization
        );
    }

    #[test]
    fn test_initiate_url_parameters() {
        let ex = exchange(Some("client-1"), Some("s"));
        let url = Url::parse(&ex.initiate("contoso", "http://localhost:3000/auth/callback").unwrap())
            .unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("login.example.com"));
        assert_eq!(params["client_id"], "client-1");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/auth/callback");
        assert!(params["scope"].contains("offline_access"));
        assert_eq!(
            OAuthState::decode(&params["state"]).unwrap().organization,
            "contoso"
        );
    }

    #[tokio::test]
    async fn test_complete_missing_code() {
        let ex = exchange(Some("client"), Some("s"));
        let state = OAuthState {
            organization: "contoso".to_string(),
        }
        .encode();
        assert_eq!(
            ex.complete("", &state, "http://cb").await.unwrap_err(),
            ExchangeFailure::MissingCode
        );
    }

    #[tokio::test]
    async fn test_complete_not_configured() {
        let ex = exchange(None, None);
        let state = OAuthState {
            organization: "contoso".to_string(),
        }
        .encode();
        assert_eq!(
            ex.complete("code", &state, "http://cb").await.unwrap_err(),
            ExchangeFailure::NotConfigured
        );
    }

    #[test]
    fn test_subject_from_id_token() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"abc","oid":"def"}"#);
        let token = format!("header.{}.sig", payload);
        assert_eq!(subject_from_id_token(&token).as_deref(), Some("abc"));

        let oid_only = format!("h.{}.s", URL_SAFE_NO_PAD.encode(r#"{"oid":"def"}"#));
        assert_eq!(subject_from_id_token(&oid_only).as_deref(), Some("def"));

        assert!(subject_from_id_token("opaque").is_none());
    }

    #[test]
    fn test_grant_debug_redacts_token() {
        let grant = SessionGrant {
            token: "secret-session".to_string(),
            expires_in: 10,
            organization: "contoso".to_string(),
        };
        assert!(!format!("{:?}", grant).contains("secret-session"));
    }
}
