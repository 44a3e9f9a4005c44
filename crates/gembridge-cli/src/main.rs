//! CLI entry point - the composition root.
//!
//! This is the ONLY place where the backend adapter and the gateway are
//! wired together.

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gembridge_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let backend_config = cli.backend_config()?;
    info!(backend = %cli.backend, config = ?backend_config, "Configuring backend");
    let backend = gembridge_runtime::build_backend(cli.backend, backend_config)?;

    let addr = cli.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    gembridge_proxy::serve(listener, backend, cli.proxy_config(), cancel).await
}
