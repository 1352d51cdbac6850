//! Federated session tokens
//!
//! A session token is an HS256 JWT signed with the configured shared
//! secret. It wraps a downstream access token obtained through the OAuth
//! exchange in the custom `accessToken` claim.

use std::fmt;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a session token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity-token subject
    pub sub: String,
    /// Downstream access credential
    #[serde(rename = "accessToken")]
    pub access_token: String,
    /// Organization the session is scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Issued at (UTC seconds)
    pub iat: i64,
    /// Expiry (UTC seconds)
    pub exp: i64,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("sub", &self.sub)
            .field("access_token", &"<redacted>")
            .field("organization", &self.organization)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("iss", &self.iss)
            .finish()
    }
}

/// A verified session token: typed claims plus the raw claim set.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    /// Typed claims
    pub claims: SessionClaims,
    /// Every claim in the token, including unknown ones
    pub raw: serde_json::Value,
}

/// Signs a session token.
///
/// # Errors
///
/// Returns the underlying `jsonwebtoken` error if encoding fails.
///
/// # Examples
///
/// ```
/// use ado_mcp::auth::jwt::{issue_session_token, verify_session_token, SessionClaims};
///
/// let now = chrono::Utc::now().timestamp();
/// let claims = SessionClaims {
///     sub: "user-1".to_string(),
///     access_token: "downstream".to_string(),
///     organization: Some("contoso".to_string()),
///     iat: now,
///     exp: now + 600,
///     iss: None,
/// };
/// let token = issue_session_token("secret", &claims).unwrap();
/// let verified = verify_session_token("secret", &token).unwrap();
/// assert_eq!(verified.claims, claims);
/// ```
pub fn issue_session_token(
    secret: &str,
    claims: &SessionClaims,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verifies signature and expiry of a session token.
///
/// # Errors
///
/// Returns the underlying `jsonwebtoken` error for a bad signature, an
/// expired token, a token that is not a JWT, or claims that do not match
/// [`SessionClaims`].
pub fn verify_session_token(
    secret: &str,
    token: &str,
) -> Result<VerifiedSession, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_aud = false;

    let data = decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    let claims: SessionClaims = serde_json::from_value(data.claims.clone())
        .map_err(jsonwebtoken::errors::Error::from)?;

    Ok(VerifiedSession {
        claims,
        raw: data.claims,
    })
}
