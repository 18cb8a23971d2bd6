//! `extreload dev`: watch, patch, reload until Ctrl+C.

use anyhow::{Context, Result};

use crate::actor::Coordinator;
use crate::config::ExtReloadConfig;
use crate::core::setup_shutdown_handler;

/// Run the dev loop on a current-thread runtime.
pub fn run_dev(config: ExtReloadConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let shutdown = setup_shutdown_handler()?;
    runtime.block_on(
        Coordinator::with_config(config)
            .with_shutdown_signal(shutdown)
            .run(),
    )
}
