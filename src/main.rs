//! ado-mcp - Azure DevOps MCP server
//!
#![doc = "ado-mcp - Azure DevOps MCP server"]
#![doc = "Main entry point for the ado-mcp server binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ado_mcp::cli::{Cli, Commands};
use ado_mcp::config::{Config, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Logging settings come from config, so tracing starts after loading
    init_tracing(&config.logging);

    // Validate configuration
    config.validate()?;

    // No-op unless built with the `prometheus` feature
    ado_mcp::metrics::init_metrics_exporter();

    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!(config = config_path, "Starting serve command");
            ado_mcp::server::serve(config).await
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ado_mcp={}", logging.level)));

    let json = logging.json;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}
