//! Dual-scheme credential validation
//!
//! [`CredentialValidator::validate`] accepts a presented bearer string and
//! an optional out-of-band organization and resolves a [`CallerIdentity`]:
//!
//! 1. If a signing secret is configured, the string is first verified as a
//!    federated session token. Success selects the federated scheme.
//! 2. Any verification failure falls through to the credential-token
//!    scheme: one read-only downstream call with the string as a PAT.
//!
//! A scheme that is disabled by configuration yields
//! [`AuthFailure::NotEnabled`] instead of being attempted.

use crate::ado::{AdoClientFactory, AdoCredential};
use crate::auth::identity::{AuthScheme, CallerIdentity};
use crate::auth::jwt::verify_session_token;
use crate::config::AuthConfig;
use crate::error::{AdoMcpError, AuthFailure};
use crate::metrics::record_auth_attempt;

/// Validates credentials against the configured schemes.
#[derive(Debug, Clone)]
pub struct CredentialValidator {
    pat_enabled: bool,
    oauth_enabled: bool,
    jwt_secret: Option<String>,
    clients: AdoClientFactory,
    user_agent: String,
}

impl CredentialValidator {
    /// Creates a validator.
    ///
    /// # Arguments
    ///
    /// * `auth` - Scheme toggles and signing secret
    /// * `clients` - Factory for the downstream validation call
    /// * `user_agent` - `User-Agent` sent on validation calls
    pub fn new(auth: &AuthConfig, clients: AdoClientFactory, user_agent: impl Into<String>) -> Self {
        Self {
            pat_enabled: auth.pat_enabled,
            oauth_enabled: auth.oauth_enabled,
            jwt_secret: auth
                .jwt_secret
                .clone()
                .filter(|s| !s.trim().is_empty()),
            clients,
            user_agent: user_agent.into(),
        }
    }

    /// Resolves the caller behind `presented`.
    ///
    /// # Arguments
    ///
    /// * `presented` - Bearer string from the `Authorization` header
    /// * `declared_organization` - Organization supplied out-of-band
    ///
    /// # Errors
    ///
    /// Returns the [`AuthFailure`] of whichever scheme was selected.
    pub async fn validate(
        &self,
        presented: &str,
        declared_organization: Option<&str>,
    ) -> Result<CallerIdentity, AuthFailure> {
        if !self.pat_enabled && !self.oauth_enabled {
            record_auth_attempt("none", AuthFailure::NotEnabled.code());
            return Err(AuthFailure::NotEnabled);
        }

        if let Some(result) = self.try_federated(presented, declared_organization) {
            return result;
        }

        self.validate_credential_token(presented, declared_organization)
            .await
    }

    /// Federated attempt; `None` means "not a session token, fall through".
    fn try_federated(
        &self,
        presented: &str,
        declared_organization: Option<&str>,
    ) -> Option<Result<CallerIdentity, AuthFailure>> {
        let secret = self.jwt_secret.as_deref()?;
        let verified = match verify_session_token(secret, presented) {
            Ok(verified) => verified,
            Err(e) => {
                tracing::debug!(error = %e, "Not a session token; trying credential-token scheme");
                return None;
            }
        };

        let scheme = AuthScheme::FederatedToken;
        if !self.oauth_enabled {
            record_auth_attempt(scheme.as_str(), AuthFailure::NotEnabled.code());
            return Some(Err(AuthFailure::NotEnabled));
        }

        let organization = verified
            .claims
            .organization
            .as_deref()
            .filter(|o| !o.trim().is_empty())
            .or(declared_organization)
            .unwrap_or_default();

        let result = CallerIdentity::new(scheme, verified.claims.access_token.clone(), organization)
            .map(|identity| {
                identity
                    .with_subject(verified.claims.sub.clone())
                    .with_claims(verified.raw)
            });

        match &result {
            Ok(identity) => {
                tracing::info!(
                    scheme = %scheme,
                    organization = %identity.organization(),
                    subject = identity.subject().unwrap_or_default(),
                    "Caller authenticated"
                );
                record_auth_attempt(scheme.as_str(), "success");
            }
            Err(failure) => record_auth_attempt(scheme.as_str(), failure.code()),
        }
        Some(result)
    }

    /// Credential-token scheme: one downstream call decides validity.
    ///
    /// # Errors
    ///
    /// - [`AuthFailure::NotEnabled`] if the scheme is disabled
    /// - [`AuthFailure::MissingOrganization`] before any remote call if no
    ///   organization was declared
    /// - [`AuthFailure::InvalidCredential`] if the downstream call fails for
    ///   any reason, including the API being unreachable
    pub async fn validate_credential_token(
        &self,
        presented: &str,
        declared_organization: Option<&str>,
    ) -> Result<CallerIdentity, AuthFailure> {
        let scheme = AuthScheme::CredentialToken;
        if !self.pat_enabled {
            record_auth_attempt(scheme.as_str(), AuthFailure::NotEnabled.code());
            return Err(AuthFailure::NotEnabled);
        }

        let organization = match declared_organization.map(str::trim) {
            Some(org) if !org.is_empty() => org,
            _ => {
                record_auth_attempt(scheme.as_str(), AuthFailure::MissingOrganization.code());
                return Err(AuthFailure::MissingOrganization);
            }
        };

        let identity = CallerIdentity::new(scheme, presented, organization).map_err(|failure| {
            record_auth_attempt(scheme.as_str(), failure.code());
            failure
        })?;

        let client = self.clients.create(
            organization,
            AdoCredential::Pat(presented.to_string()),
            &self.user_agent,
        );

        match client.list_projects(Some(1)).await {
            Ok(_) => {
                tracing::info!(scheme = %scheme, organization, "Caller authenticated");
                record_auth_attempt(scheme.as_str(), "success");
                Ok(identity)
            }
            Err(e) => {
                let outcome = match e.downcast_ref::<AdoMcpError>() {
                    Some(AdoMcpError::Downstream { status: None, .. }) => "unreachable",
                    _ => "rejected",
                };
                tracing::warn!(
                    scheme = %scheme,
                    organization,
                    outcome,
                    error = %e,
                    "Credential validation failed"
                );
                record_auth_attempt(scheme.as_str(), outcome);
                Err(AuthFailure::InvalidCredential)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{issue_session_token, SessionClaims};
    use crate::config::AdoConfig;
    use chrono::Utc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn validator(base: &str, pat: bool, oauth: bool, secret: Option<&str>) -> CredentialValidator {
        let auth = AuthConfig {
            pat_enabled: pat,
            oauth_enabled: oauth,
            jwt_secret: secret.map(str::to_string),
            ..AuthConfig::default()
        };
        let clients = AdoClientFactory::new(&AdoConfig {
            api_base: base.to_string(),
            ..AdoConfig::default()
        })
        .unwrap();
        CredentialValidator::new(&auth, clients, "ado-mcp/test")
    }

    fn session_token(secret: &str, organization: Option<&str>) -> String {
        let now = Utc::now().timestamp();
        issue_session_token(
            secret,
            &SessionClaims {
                sub: "user-1".to_string(),
                access_token: "downstream".to_string(),
                organization: organization.map(str::to_string),
                iat: now,
                exp: now + 600,
                iss: None,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_no_scheme_enabled() {
        let v = validator("http://127.0.0.1:9", false, false, None);
        assert_eq!(
            v.validate("anything", Some("contoso")).await.unwrap_err(),
            AuthFailure::NotEnabled
        );
    }

    #[tokio::test]
    async fn test_missing_organization_fails_before_remote_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let v = validator(&server.uri(), true, false, None);
        assert_eq!(
            v.validate("pat", None).await.unwrap_err(),
            AuthFailure::MissingOrganization
        );
        assert_eq!(
            v.validate("pat", Some("  ")).await.unwrap_err(),
            AuthFailure::MissingOrganization
        );
    }

    #[tokio::test]
    async fn test_valid_pat() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contoso/_apis/projects"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let v = validator(&server.uri(), true, false, None);
        let identity = v.validate("pat", Some("contoso")).await.unwrap();
        assert_eq!(identity.scheme(), AuthScheme::CredentialToken);
        assert_eq!(identity.token(), "pat");
        assert_eq!(identity.organization(), "contoso");
        assert!(identity.claims().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_invalid_credential() {
        let v = validator("http://127.0.0.1:9", true, false, None);
        assert_eq!(
            v.validate("pat", Some("contoso")).await.unwrap_err(),
            AuthFailure::InvalidCredential
        );
    }

    #[tokio::test]
    async fn test_federated_token_accepted() {
        let v = validator("http://127.0.0.1:9", false, true, Some("secret"));
        let token = session_token("secret", Some("contoso"));
        let identity = v.validate(&token, None).await.unwrap();
        assert_eq!(identity.scheme(), AuthScheme::FederatedToken);
        assert_eq!(identity.token(), "downstream");
        assert_eq!(identity.organization(), "contoso");
        assert_eq!(identity.subject(), Some("user-1"));
        assert!(identity.claims().is_some());
    }

    #[tokio::test]
    async fn test_federated_org_claim_wins_over_header() {
        let v = validator("http://127.0.0.1:9", false, true, Some("secret"));
        let token = session_token("secret", Some("from-claim"));
        let identity = v.validate(&token, Some("from-header")).await.unwrap();
        assert_eq!(identity.organization(), "from-claim");
    }

    #[tokio::test]
    async fn test_federated_org_falls_back_to_header() {
        let v = validator("http://127.0.0.1:9", false, true, Some("secret"));
        let token = session_token("secret", None);
        let identity = v.validate(&token, Some("from-header")).await.unwrap();
        assert_eq!(identity.organization(), "from-header");

        assert_eq!(
            v.validate(&token, None).await.unwrap_err(),
            AuthFailure::MissingOrganization
        );
    }

    #[tokio::test]
    async fn test_valid_session_token_with_oauth_disabled() {
        let v = validator("http://127.0.0.1:9", true, false, Some("secret"));
        let token = session_token("secret", Some("contoso"));
        assert_eq!(
            v.validate(&token, Some("contoso")).await.unwrap_err(),
            AuthFailure::NotEnabled
        );
    }

    #[tokio::test]
    async fn test_opaque_token_with_pat_disabled() {
        let v = validator("http://127.0.0.1:9", false, true, Some("secret"));
        assert_eq!(
            v.validate("opaque", Some("contoso")).await.unwrap_err(),
            AuthFailure::NotEnabled
        );
    }
}
