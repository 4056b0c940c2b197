use clap::Parser;
use contenthub::{config::Config, logging, start_server_with_config};
use std::path::PathBuf;
use std::time::Duration;

/// Content hub auth backend
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "CONTENTHUB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    logging::init(&config.logging);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    // Provider registration happens here; any failure aborts startup
    start_server_with_config(config, shutdown_rx).await?;

    // Wait for Ctrl-C
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, stopping server...");

    let _ = shutdown_tx.send(());
    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(())
}
