//! Autonoma vehicle monitor - entry point.

use anyhow::Result;
use autonoma_monitor::config::CONFIG_ENV;
use autonoma_monitor::{AppConfig, Application};
use clap::Parser;
use tracing::info;

/// Headless monitor for the Autonoma telemetry stream
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via AUTONOMA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // TLS crypto provider must be installed before any wss connection
    autonoma_ws::init_crypto();

    let args = Args::parse();

    autonoma_observability::init_logging()?;

    info!("Starting Autonoma monitor v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > AUTONOMA_CONFIG > config/default.toml
    let config_path = args.config.or_else(|| std::env::var(CONFIG_ENV).ok());
    info!(
        config_path = config_path.as_deref().unwrap_or("<default>"),
        "Loading configuration"
    );

    let config = AppConfig::load(config_path.as_deref())?;
    info!(
        api_url = %config.api.base_url,
        stream_url = %config.stream.ws_url()?,
        poll_status = config.monitor.poll_status,
        metrics_port = config.monitor.metrics_port,
        "Configuration loaded"
    );

    let app = Application::new(config)?;
    app.run().await?;

    Ok(())
}
