//! Ctrl+C handling for `dev`.
//!
//! The first Ctrl+C asks the dev loop to stop (closing reload clients and
//! the watcher); a second one exits immediately.

use tokio::sync::watch;

/// Resolves once shutdown has been requested.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                // Handler gone; nothing can request shutdown anymore
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Install the Ctrl+C handler. Call once, right before entering the
/// dev loop; until then the default signal behavior applies.
pub fn setup_shutdown_handler() -> anyhow::Result<ShutdownSignal> {
    let (tx, signal) = ShutdownSignal::channel();
    ctrlc::set_handler(move || {
        if tx.send_replace(true) {
            std::process::exit(130);
        }
        crate::log!("dev"; "shutting down...");
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;
    Ok(signal)
}

// =============================================================================
// Tests
// =============================================================================
