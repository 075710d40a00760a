//! repo-sync - one-way repository synchronization
//!
//! Pages through an organization's repositories on the upstream Git-hosting
//! API and forwards reduced records to the internal storage API.

use anyhow::{Context, Result};
use std::sync::Arc;
use sync_lib::{init_tracing, ReqwestTransport, SyncLogger, Synchronizer};
use tokio::sync::broadcast;
use tracing::info;

mod config;

const JOB_NAME: &str = "sync-github";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so its log level applies
    let config = config::AppConfig::load()?;
    init_tracing(&config.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting repo-sync");

    let logger = SyncLogger::new(JOB_NAME);
    let transport =
        ReqwestTransport::with_timeout(config.http_timeout()).context("Failed to create HTTP client")?;
    let mut synchronizer = Synchronizer::create(&config.sync, Arc::new(transport), logger.clone())
        .context("Invalid sync configuration")?;
    logger.log_settings(&synchronizer.config().redacted());

    // Stop between pages on Ctrl-C
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let outcome = synchronizer
        .run_until_shutdown(shutdown_rx)
        .await
        .context("Synchronization failed")?;

    if !outcome.completed {
        anyhow::bail!(
            "Synchronization interrupted at page {}",
            outcome.final_cursor
        );
    }

    info!(
        pages = outcome.pages_forwarded,
        records = outcome.records_forwarded,
        "repo-sync finished"
    );
    Ok(())
}
