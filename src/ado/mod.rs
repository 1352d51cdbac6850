//! Downstream Azure DevOps API
//!
//! - `client` -- organization-scoped REST client and its factory

pub mod client;

pub use client::{AdoClient, AdoClientFactory, AdoCredential, TeamProject, WebApiTeam, WorkItemReference};
