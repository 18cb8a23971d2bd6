//! Actor Coordinator - runs `dev` mode.
//!
//! ```text
//! FsActor --Compile--> Coordinator --assets_finalized/build_done--> DevReloadPlugin
//!                      (load, patch, mirror)                         (ReloadActor)
//! ```
//!
//! Compilations run one at a time on the coordinator itself; the watcher
//! keeps buffering while one is in progress.

use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::WatchMsg;
use crate::bundle::{MirrorStats, OutputMirror};
use crate::config::ExtReloadConfig;
use crate::core::ShutdownSignal;
use crate::logger::{error_chain, status_detach, status_error, status_success, status_unchanged};
use crate::patch::PatchReport;
use crate::plugin::DevReloadPlugin;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the dev loop.
pub struct Coordinator {
    config: ExtReloadConfig,
    shutdown: Option<ShutdownSignal>,
}

impl Coordinator {
    pub fn with_config(config: ExtReloadConfig) -> Self {
        Self {
            config,
            shutdown: None,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Run until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            mut shutdown,
        } = self;

        let plugin = DevReloadPlugin::start(&config)
            .await
            .context("failed to start live reload")?;

        // Watcher first, so writes during the initial compilation are kept
        let (watch_tx, mut watch_rx) = mpsc::channel::<WatchMsg>(CHANNEL_BUFFER);
        let fs = FsActor::new(config.extension.source.clone(), watch_tx)
            .map_err(|e| anyhow!("watcher failed: {}", e))?;
        let fs_handle = tokio::spawn(fs.run());

        let mut mirror = OutputMirror::new(&config.extension.source, &config.extension.dir);
        crate::log!("dev"; "{} -> {}", mirror.source().display(), mirror.dest().display());
        compile(&plugin, &mut mirror).await;

        crate::debug!("actor"; "start");
        loop {
            tokio::select! {
                msg = watch_rx.recv() => match msg {
                    Some(WatchMsg::Compile { changed_files }) => {
                        crate::debug!("dev"; "compiling after {} change(s)", changed_files);
                        compile(&plugin, &mut mirror).await;
                    }
                    None => break,
                },
                () = wait_for_shutdown(shutdown.as_mut()) => break,
            }
        }

        fs_handle.abort();
        status_detach();
        plugin.shutdown().await;
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}

async fn wait_for_shutdown(signal: Option<&mut ShutdownSignal>) {
    match signal {
        Some(signal) => signal.wait().await,
        None => std::future::pending().await,
    }
}

/// What one compilation did.
#[derive(Debug)]
pub enum CompileOutcome {
    /// Patched and mirrored; `stats.changed()` decides the reload.
    Done { report: PatchReport, stats: MirrorStats },
    /// Build output unreadable or unwritable; nothing reloaded.
    Failed,
}

/// Run one compilation: load the build output, patch it through the
/// plugin, mirror it, and tell the plugin whether anything changed.
pub async fn compile(plugin: &DevReloadPlugin, mirror: &mut OutputMirror) -> CompileOutcome {
    let started = Instant::now();

    let mut assets = match mirror.load() {
        Ok(assets) => assets,
        Err(e) => {
            status_error("build output unavailable", &error_chain(&e));
            return CompileOutcome::Failed;
        }
    };

    let report = plugin.assets_finalized(&mut assets);

    let stats = match mirror.commit(&assets) {
        Ok(stats) => stats,
        Err(e) => {
            status_error("failed to update extension", &error_chain(&e));
            return CompileOutcome::Failed;
        }
    };

    let elapsed = started.elapsed().as_millis();
    if stats.changed() {
        status_success(&format!(
            "{} written, {} removed ({}) in {} ms",
            stats.written,
            stats.removed,
            report.summary(),
            elapsed
        ));
    } else {
        status_unchanged(&format!("no changes ({} files)", stats.unchanged));
    }

    plugin.build_done(stats.changed()).await;
    CompileOutcome::Done { report, stats }
}
