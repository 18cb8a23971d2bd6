//! Bundler-facing facade.
//!
//! One [`DevReloadPlugin`] per configuration. A host calls its three hook
//! points around every compilation:
//!
//! ```text
//! assets_finalized(&mut AssetMap) --> build_done(changed) --> ... --> shutdown()
//!        (patch in place)              (debounce + launch)           (close clients)
//! ```

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::actor::messages::ReloadMsg;
use crate::actor::reload::ReloadActor;
use crate::config::{ExtReloadConfig, Strategy};
use crate::devtools::{DevToolsController, DevToolsError};
use crate::identity::{ExtensionIdentity, IdentityError, get_or_create_identity};
use crate::launch::{LaunchManager, LaunchOptions};
use crate::patch::{AssetMap, AssetPatcher, PatchReport};
use crate::reload::{DevToolsDriven, ReloadServer, ReloadStrategy, SocketPush, TransportError};

/// Reload actor mailbox size.
const RELOAD_CHANNEL_CAPACITY: usize = 64;

/// Startup failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    DevTools(#[from] DevToolsError),
}

pub struct DevReloadPlugin {
    identity: ExtensionIdentity,
    patcher: AssetPatcher,
    strategy: Strategy,
    server: Option<ReloadServer>,
    reload_tx: mpsc::Sender<ReloadMsg>,
    actor: JoinHandle<()>,
}

impl DevReloadPlugin {
    /// Load (or create) the identity, then start reload machinery for
    /// the configured strategy. Must run inside a Tokio runtime.
    pub async fn start(config: &ExtReloadConfig) -> Result<Self, PluginError> {
        let identity = get_or_create_identity(&config.extension.cache_dir)?;
        Self::with_identity(config, identity).await
    }

    pub async fn with_identity(
        config: &ExtReloadConfig,
        identity: ExtensionIdentity,
    ) -> Result<Self, PluginError> {
        let (reload_tx, reload_rx) = mpsc::channel(RELOAD_CHANNEL_CAPACITY);
        let patcher = AssetPatcher::new(&config.extension.manifest, identity.manifest_key());

        let (patcher, server, strategy): (_, _, Box<dyn ReloadStrategy>) =
            match config.reload.strategy {
                Strategy::Socket => {
                    let server = ReloadServer::start(config.reload.port, reload_tx.clone()).await?;
                    let strategy = SocketPush::new(config.browser.grace_period());
                    (
                        patcher.with_reload_client(server.port()),
                        Some(server),
                        Box::new(strategy),
                    )
                }
                Strategy::Devtools => {
                    let controller = DevToolsController::new(
                        config.browser.remote_debug_port,
                        config.browser.debug_timeout(),
                    )?;
                    let strategy = DevToolsDriven::new(
                        controller,
                        config.extension.manifest_path(),
                        identity.extension_id().to_string(),
                    );
                    (patcher, None, Box::new(strategy))
                }
            };

        let mut actor = ReloadActor::new(reload_rx, strategy, config.reload.debounce());
        if config.browser.auto_launch {
            actor = actor.with_launcher(LaunchManager::new(launch_options(config, &identity)));
        }

        crate::log!("reload"; "extension id {}", identity.extension_id());
        if let Some(server) = &server {
            crate::log!("reload"; "live reload on {}", server.origin());
        } else {
            crate::log!("reload"; "reloading through devtools on port {}",
                config.browser.remote_debug_port);
        }

        Ok(Self {
            identity,
            patcher,
            strategy: config.reload.strategy,
            server,
            reload_tx,
            actor: tokio::spawn(actor.run()),
        })
    }

    pub fn identity(&self) -> &ExtensionIdentity {
        &self.identity
    }

    /// Bound live-reload port, `None` for the devtools strategy.
    pub fn port(&self) -> Option<u16> {
        self.server.as_ref().map(ReloadServer::port)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// "Assets finalized" hook: patch the compilation in place.
    pub fn assets_finalized(&self, assets: &mut AssetMap) -> PatchReport {
        let report = self.patcher.patch(assets);
        for warning in &report.warnings {
            crate::warn!("patch"; "{}", crate::logger::error_chain(warning));
        }
        crate::debug!("patch"; "{}", report.summary());
        report
    }

    /// "Build done" hook: schedule a reload when the build changed
    /// anything, then launch a browser if none is attached.
    pub async fn build_done(&self, changed: bool) {
        self.send(ReloadMsg::BuildDone { changed }).await;
    }

    /// Restart the debounce timer without a launch check.
    pub async fn notify_assets_changed(&self) {
        self.send(ReloadMsg::AssetsChanged).await;
    }

    /// "Shutdown" hook: drop any pending reload, close every client,
    /// and wait for the actor to stop.
    pub async fn shutdown(self) {
        self.send(ReloadMsg::Shutdown).await;
        if let Some(server) = &self.server {
            server.stop();
        }
        if let Err(e) = self.actor.await {
            crate::error!("reload"; "actor ended abnormally: {}", e);
        }
    }

    async fn send(&self, msg: ReloadMsg) {
        if self.reload_tx.send(msg).await.is_err() {
            crate::debug!("reload"; "actor already stopped");
        }
    }
}

/// Patcher for one-shot use without a running server.
///
/// The socket strategy still gets the reload client, pinned to the
/// configured port, so a later `dev` session can reach it.
pub fn standalone_patcher(config: &ExtReloadConfig, identity: &ExtensionIdentity) -> AssetPatcher {
    let patcher = AssetPatcher::new(&config.extension.manifest, identity.manifest_key());
    match config.reload.strategy {
        Strategy::Socket => patcher.with_reload_client(config.reload.port),
        Strategy::Devtools => patcher,
    }
}

fn launch_options(config: &ExtReloadConfig, identity: &ExtensionIdentity) -> LaunchOptions {
    LaunchOptions {
        executable: config.browser.executable.clone(),
        extension_dir: config.extension.dir.clone(),
        profile_dir: config.extension.profile_dir(),
        extension_id: identity.extension_id().to_string(),
        open_page: config.browser.open_page.clone(),
        remote_debug_port: match config.reload.strategy {
            Strategy::Devtools => Some(config.browser.remote_debug_port),
            Strategy::Socket => None,
        },
    }
}
