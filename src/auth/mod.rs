//! Authentication
//!
//! Every protocol-bearing request is authenticated by one of two schemes
//! before any protocol message is parsed:
//!
//! - `identity`  -- [`CallerIdentity`], the uniform result of authentication
//! - `jwt`       -- federated session token signing and verification
//! - `validator` -- scheme selection and credential validation
//! - `gateway`   -- axum middleware binding the identity to the request
//! - `oauth`     -- authorization-code exchange that mints session tokens

pub mod gateway;
pub mod identity;
pub mod jwt;
pub mod oauth;
pub mod validator;

pub use identity::{AuthScheme, CallerIdentity};
pub use oauth::{OAuthExchange, SessionGrant};
pub use validator::CredentialValidator;
