//! ado-mcp - Azure DevOps MCP server library
//!
//! This library serves the Model Context Protocol over HTTP for Azure
//! DevOps, behind two authentication schemes that both resolve to a single
//! [`auth::CallerIdentity`] before any protocol message is parsed.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Credential validation, gateway middleware, and OAuth exchange
//! - `mcp`: Protocol types, per-session servers, transports, and delegation
//! - `server`: axum router, handlers, and the live stream registry
//! - `ado`: Downstream Azure DevOps REST client
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `metrics`: Counters, gauges, and histograms over the `metrics` facade
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use ado_mcp::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!     ado_mcp::server::serve(config).await
//! }
//! ```

pub mod ado;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
pub mod metrics;
pub mod server;

// Re-export commonly used types
pub use auth::{AuthScheme, CallerIdentity, CredentialValidator};
pub use config::Config;
pub use error::{AdoMcpError, Result};
pub use server::{build_router, AppState};

#[cfg(test)]
pub mod test_utils;
