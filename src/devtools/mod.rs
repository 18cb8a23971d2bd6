//! Reload through the browser's remote-debugging protocol.
//!
//! Used by the `devtools` strategy: nothing is injected into the build.
//! Each cycle lists targets afresh, finds the extension worker by manifest
//! name, evaluates `chrome.runtime.reload()` in it, then reloads the first
//! ordinary page with the cache bypassed.
//!
//! - `target` - target list model and lookups
//! - `client` - HTTP listing and one-shot command exchange

pub mod client;
pub mod target;

use std::time::Duration;

use serde_json::json;
use thiserror::Error;

pub use target::{DevToolsTarget, extension_id_from_url, find_active_page, find_extension_target};

/// The extension's worker could not be identified. The cycle is skipped.
#[derive(Debug, Error)]
pub enum TargetResolutionError {
    #[error("no extension worker titled `{name}` among {workers} worker target(s)")]
    NotFound { name: String, workers: usize },

    #[error("target `{0}` has no debugger socket (is DevTools attached to it?)")]
    NoDebuggerUrl(String),
}

#[derive(Debug, Error)]
pub enum DevToolsError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("debug endpoint {url} unreachable")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Target(#[from] TargetResolutionError),

    #[error("debugger socket {url} failed")]
    Socket {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("`{method}` got no reply within {ms} ms")]
    Timeout { method: String, ms: u64 },

    #[error("debugger socket closed before `{0}` replied")]
    Closed(String),

    #[error("`{method}` failed: {message}")]
    Command { method: String, message: String },

    #[error("malformed debugger message")]
    Json(#[from] serde_json::Error),
}

/// Outcome of one successful reload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub extension_id: Option<String>,
    pub page_reloaded: bool,
}

pub struct DevToolsController {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    next_id: u64,
}

impl DevToolsController {
    /// Controller for `http://127.0.0.1:<port>`.
    pub fn new(port: u16, timeout: Duration) -> Result<Self, DevToolsError> {
        Self::with_endpoint(format!("http://127.0.0.1:{port}"), timeout)
    }

    pub fn with_endpoint(endpoint: String, timeout: Duration) -> Result<Self, DevToolsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DevToolsError::Client)?;
        Ok(Self {
            http,
            endpoint,
            timeout,
            next_id: 0,
        })
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub async fn fetch_targets(&self) -> Result<Vec<DevToolsTarget>, DevToolsError> {
        client::fetch_targets(&self.http, &self.endpoint).await
    }

    /// Reload the extension from inside its worker.
    pub async fn reload_extension(&mut self, target: &DevToolsTarget) -> Result<(), DevToolsError> {
        let url = debugger_url(target)?;
        let id = self.next_id();
        let params = json!({ "expression": "chrome.runtime.reload()" });

        match client::send_command(url, id, "Runtime.evaluate", params, self.timeout).await {
            Ok(_) => Ok(()),
            // The worker may be torn down before it can answer
            Err(DevToolsError::Closed(_)) => {
                crate::debug!("devtools"; "worker closed the socket while reloading");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reload the first ordinary page. Returns `false` if there is none.
    pub async fn reload_active_page(
        &mut self,
        targets: &[DevToolsTarget],
    ) -> Result<bool, DevToolsError> {
        let Some(page) = find_active_page(targets) else {
            return Ok(false);
        };
        let url = debugger_url(page)?;
        let id = self.next_id();
        let params = json!({ "ignoreCache": true });

        client::send_command(url, id, "Page.reload", params, self.timeout).await?;
        Ok(true)
    }

    /// One full reload: list, resolve, reload extension, reload page.
    pub async fn run_cycle(&mut self, manifest_name: &str) -> Result<CycleReport, DevToolsError> {
        let targets = self.fetch_targets().await?;
        let worker = find_extension_target(&targets, manifest_name)?;
        let extension_id = worker.extension_id();
        crate::debug!("devtools"; "target {} ({})", worker.id, extension_id.as_deref().unwrap_or("?"));

        self.reload_extension(worker).await?;

        let page_reloaded = match self.reload_active_page(&targets).await {
            Ok(reloaded) => reloaded,
            Err(e) => {
                crate::warn!("devtools"; "page reload failed: {}", crate::logger::error_chain(&e));
                false
            }
        };

        Ok(CycleReport {
            extension_id,
            page_reloaded,
        })
    }
}

fn debugger_url(target: &DevToolsTarget) -> Result<&str, TargetResolutionError> {
    target
        .debugger_url
        .as_deref()
        .ok_or_else(|| TargetResolutionError::NoDebuggerUrl(target.id.clone()))
}
