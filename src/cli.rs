//! Command-line interface definition for the ADO MCP server
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// ado-mcp - Authenticated MCP server for Azure DevOps
///
/// Serves the Model Context Protocol over a streaming (SSE) transport and a
/// single-shot HTTP transport, authenticating every caller first.
#[derive(Parser, Debug, Clone)]
#[command(name = "ado-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the listen host from config
        #[arg(long)]
        host: Option<String>,

        /// Override the listen port from config
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: Commands::Serve {
                host: None,
                port: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                host: None,
                port: None
            }
        ));
    }

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::try_parse_from(["ado-mcp", "serve"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Serve { .. }));
    }

    #[test]
    fn test_cli_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from(["ado-mcp", "serve", "--host", "0.0.0.0", "--port", "8080"])
            .unwrap();
        let Commands::Serve { host, port } = cli.command;
        assert_eq!(host, Some("0.0.0.0".to_string()));
        assert_eq!(port, Some(8080));
    }

    #[test]
    fn test_cli_parse_with_config_and_verbose() {
        let cli = Cli::try_parse_from(["ado-mcp", "-v", "--config", "custom.yaml", "serve"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
    }

    #[test]
    fn test_cli_parse_invalid_port() {
        let cli = Cli::try_parse_from(["ado-mcp", "serve", "--port", "not-a-port"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_missing_command() {
        let cli = Cli::try_parse_from(["ado-mcp"]);
        assert!(cli.is_err());
    }
}
