//! `medchain-indexer`: tails consent and audit events into the local
//! audit document.

use anyhow::{Context, Result};
use tracing::info;

use node_runtime::telemetry::init_logging;
use node_runtime::{IndexerRuntime, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Invalid configuration")?;
    init_logging(&config.log).context("Failed to initialize logging")?;

    info!("===========================================");
    info!("  MedChain Indexer v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let mut runtime = IndexerRuntime::new(&config).context("Failed to start indexer")?;
    runtime.start();

    info!("Indexer running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    if let Some(stats) = runtime.shutdown().await {
        info!(
            ticks = stats.ticks,
            failed_ticks = stats.failed_ticks,
            logs_fetched = stats.logs_fetched,
            events_appended = stats.events_appended,
            duplicates_dropped = stats.duplicates_dropped,
            decode_failures = stats.decode_failures,
            "Indexer stopped"
        );
    }
    Ok(())
}
