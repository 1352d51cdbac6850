//! MCP (Model Context Protocol) server support
//!
//! The server speaks JSON-RPC 2.0 and is reachable over two transports: a
//! persistent SSE stream and a single-shot request/response channel. Both
//! bind to the same message-oriented [`server::ProtocolServer`] seam.
//!
//! # Module Layout
//!
//! - `types`     -- MCP protocol types and JSON-RPC primitives
//! - `server`    -- `ProtocolServer` trait and the default `McpServer`
//! - `tools`     -- tool/prompt configurator and its accessor bindings
//! - `session`   -- one fresh server per session
//! - `transport` -- `Transport` trait, SSE stream and capture transports
//! - `delegate`  -- sync-delegation adapter over the capture transport

pub mod delegate;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use types::*;
