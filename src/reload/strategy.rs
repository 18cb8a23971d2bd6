//! How a debounced reload reaches the browser.
//!
//! - [`SocketPush`] broadcasts `reload` to clients injected into the build.
//! - [`DevToolsDriven`] reloads through the browser's remote-debugging
//!   endpoint; nothing is injected into the build.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::message::ServerFrame;
use super::session::ReloadSession;
use crate::devtools::DevToolsController;
use crate::identity::is_extension_id;
use crate::manifest::Manifest;

#[async_trait]
pub trait ReloadStrategy: Send {
    fn name(&self) -> &'static str;

    /// Deliver one reload.
    async fn reload(&mut self, session: &ReloadSession);

    /// Whether a browser already has the extension loaded.
    async fn browser_attached(&mut self, session: &ReloadSession, now: Instant) -> bool;
}

/// Push `reload` over the live-reload socket.
pub struct SocketPush {
    grace: Duration,
}

impl SocketPush {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }
}

#[async_trait]
impl ReloadStrategy for SocketPush {
    fn name(&self) -> &'static str {
        "socket"
    }

    async fn reload(&mut self, session: &ReloadSession) {
        let sent = session.broadcast(ServerFrame::Reload);
        if sent == 0 {
            crate::debug!("reload"; "no open clients, nothing to reload");
        }
    }

    async fn browser_attached(&mut self, session: &ReloadSession, now: Instant) -> bool {
        session.is_connected(now, self.grace)
    }
}

/// Drive reloads through the remote-debugging protocol.
///
/// The extension is located by the `name` of the patched manifest on disk,
/// read again on every cycle so renames take effect without a restart.
/// The id of the reloaded target is checked against the pinned one.
pub struct DevToolsDriven {
    controller: DevToolsController,
    manifest_path: PathBuf,
    pinned_id: String,
}

impl DevToolsDriven {
    pub fn new(controller: DevToolsController, manifest_path: PathBuf, pinned_id: String) -> Self {
        Self {
            controller,
            manifest_path,
            pinned_id,
        }
    }

    fn manifest_name(&self) -> Option<String> {
        let bytes = match std::fs::read(&self.manifest_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                crate::warn!("devtools"; "cannot read {}: {}", self.manifest_path.display(), e);
                return None;
            }
        };
        match Manifest::from_slice(&bytes) {
            Ok(manifest) => manifest.name,
            Err(e) => {
                crate::warn!("devtools"; "{}: {}", self.manifest_path.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl ReloadStrategy for DevToolsDriven {
    fn name(&self) -> &'static str {
        "devtools"
    }

    async fn reload(&mut self, _session: &ReloadSession) {
        let Some(name) = self.manifest_name() else {
            crate::warn!("devtools"; "manifest has no name, skipping reload");
            return;
        };

        match self.controller.run_cycle(&name).await {
            Ok(report) => {
                crate::debug!("devtools"; "reloaded extension {}{}",
                    report.extension_id.as_deref().unwrap_or("?"),
                    if report.page_reloaded { " and active page" } else { "" });
                if let Some(found) = &report.extension_id {
                    warn_on_id(check_target_id(&self.pinned_id, found), &self.pinned_id, found);
                }
            }
            Err(e) => crate::error!("devtools"; "{}", crate::logger::error_chain(&e)),
        }
    }

    async fn browser_attached(&mut self, _session: &ReloadSession, _now: Instant) -> bool {
        self.controller.fetch_targets().await.is_ok()
    }
}

/// How a resolved worker's id relates to the pinned identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetIdCheck {
    Pinned,
    /// Not shaped like an extension id at all.
    Malformed,
    /// A different extension with the same name, or the key was not applied.
    Mismatch,
}

pub fn check_target_id(pinned: &str, found: &str) -> TargetIdCheck {
    if !is_extension_id(found) {
        TargetIdCheck::Malformed
    } else if found != pinned {
        TargetIdCheck::Mismatch
    } else {
        TargetIdCheck::Pinned
    }
}

fn warn_on_id(check: TargetIdCheck, pinned: &str, found: &str) {
    match check {
        TargetIdCheck::Pinned => {}
        TargetIdCheck::Malformed => {
            crate::warn!("devtools"; "target url carries malformed extension id `{}`", found);
        }
        TargetIdCheck::Mismatch => {
            crate::warn!("devtools"; "reloaded extension {} but the pinned id is {} (was the \
                key stripped, or is another build loaded?)", found, pinned);
        }
    }
}
