//! Caller identity
//!
//! [`CallerIdentity`] is the single result of authentication, whichever
//! scheme produced it. Construction enforces that `organization` and
//! `token` are non-empty, so every identity that exists is usable.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::ado::AdoCredential;
use crate::error::AuthFailure;

/// Lifetime assumed for credential-token identities, which carry no expiry.
const CREDENTIAL_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Authentication scheme that produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    /// Opaque bearer token validated by a live downstream call
    CredentialToken,
    /// Locally signed session token wrapping a downstream access token
    FederatedToken,
}

impl AuthScheme {
    /// Kebab-case label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialToken => "credential-token",
            Self::FederatedToken => "federated-token",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The validated caller.
///
/// `Debug` output never includes the token.
///
/// # Examples
///
/// ```
/// use ado_mcp::auth::{AuthScheme, CallerIdentity};
///
/// let identity = CallerIdentity::new(AuthScheme::CredentialToken, "pat-123", "contoso").unwrap();
/// assert_eq!(identity.organization(), "contoso");
/// assert!(!format!("{:?}", identity).contains("pat-123"));
///
/// assert!(CallerIdentity::new(AuthScheme::CredentialToken, "pat-123", " ").is_err());
/// ```
#[derive(Clone)]
pub struct CallerIdentity {
    scheme: AuthScheme,
    token: String,
    organization: String,
    subject: Option<String>,
    claims: Option<serde_json::Value>,
}

impl CallerIdentity {
    /// Creates an identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure::MissingOrganization`] for a blank organization
    /// and [`AuthFailure::InvalidCredential`] for a blank token.
    pub fn new(
        scheme: AuthScheme,
        token: impl Into<String>,
        organization: impl Into<String>,
    ) -> Result<Self, AuthFailure> {
        let token = token.into();
        let organization = organization.into().trim().to_string();
        if organization.is_empty() {
            return Err(AuthFailure::MissingOrganization);
        }
        if token.trim().is_empty() {
            return Err(AuthFailure::InvalidCredential);
        }
        Ok(Self {
            scheme,
            token,
            organization,
            subject: None,
            claims: None,
        })
    }

    /// Attaches the identity-token subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches the full claim set. Kept only for the federated scheme.
    pub fn with_claims(mut self, claims: serde_json::Value) -> Self {
        if self.scheme == AuthScheme::FederatedToken {
            self.claims = Some(claims);
        }
        self
    }

    /// Scheme that produced this identity.
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Credential to present downstream.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Organization scope.
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Identity-token subject, if known.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Full claim set, for federated identities.
    pub fn claims(&self) -> Option<&serde_json::Value> {
        self.claims.as_ref()
    }

    /// When the credential stops being usable.
    ///
    /// Federated identities use the session token's `exp`; credential
    /// tokens have no known expiry and are given a rolling hour.
    pub fn expires_on(&self) -> DateTime<Utc> {
        self.claims
            .as_ref()
            .and_then(|c| c.get("exp"))
            .and_then(|exp| exp.as_i64())
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(CREDENTIAL_TOKEN_LIFETIME_SECS))
    }

    /// The downstream credential in the form the API client expects.
    pub fn ado_credential(&self) -> AdoCredential {
        match self.scheme {
            AuthScheme::CredentialToken => AdoCredential::Pat(self.token.clone()),
            AuthScheme::FederatedToken => AdoCredential::Bearer(self.token.clone()),
        }
    }
}

impl fmt::Debug for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerIdentity")
            .field("scheme", &self.scheme)
            .field("token", &"<redacted>")
            .field("organization", &self.organization)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
