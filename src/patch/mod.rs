//! Build asset patching.
//!
//! Runs once per compilation on the emitted asset map:
//!
//! 1. pin the extension identity (`manifest.key`)
//! 2. allow the reload socket in the manifest CSP
//! 3. emit the reload client and wire it into pages and the worker
//!
//! Steps 2 and 3 only apply when a reload client is configured (socket
//! strategy). Problems with individual assets are collected as warnings;
//! a missing or broken manifest skips the whole patch.

mod html;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::embed::client::{CLIENT_ASSET, CLIENT_MARKER, ClientVars, RELOAD_CLIENT_JS, script_tag};
use crate::manifest::{CspEdit, Manifest, ManifestError};
use crate::reload::server::origin;

pub use html::{inject_script, is_html};

/// Emitted files of one compilation: forward-slash relative path → bytes.
pub type AssetMap = FxHashMap<String, Vec<u8>>;

/// A patch step that could not be applied. Reported; the build goes on.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("`{0}` not found in build output, nothing patched")]
    ManifestMissing(String),

    #[error("`{0}` could not be patched")]
    ManifestInvalid(String, #[source] ManifestError),

    #[error("service worker `{0}` not found in build output, reload client not injected")]
    WorkerMissing(String),
}

/// What one patch run did, for status output.
#[derive(Debug, Default)]
pub struct PatchReport {
    pub manifest_patched: bool,
    /// Manifest `name`, when the manifest was readable.
    pub extension_name: Option<String>,
    pub csp: Option<CspEdit>,
    /// Pages that received the client tag, sorted.
    pub pages_injected: Vec<String>,
    /// Declared popup / options pages among `pages_injected`.
    pub ui_pages: Vec<String>,
    pub worker_injected: bool,
    /// MV2 `background.scripts` gained the client.
    pub background_scripts: bool,
    pub warnings: Vec<AssetError>,
}

impl PatchReport {
    /// One-line summary for the status display.
    pub fn summary(&self) -> String {
        if !self.manifest_patched {
            return "not patched".to_string();
        }
        let mut parts = vec!["key pinned".to_string()];
        match self.csp {
            Some(CspEdit::Extended | CspEdit::Added) => parts.push("csp updated".to_string()),
            Some(CspEdit::Unchanged) | None => {}
        }
        if !self.pages_injected.is_empty() {
            parts.push(format!("client in {} page(s)", self.pages_injected.len()));
        }
        if self.worker_injected || self.background_scripts {
            parts.push("client in background".to_string());
        }
        parts.join(", ")
    }
}

/// Reload client wiring for the socket strategy.
#[derive(Debug, Clone)]
struct ClientInjection {
    port: u16,
    script: String,
}

#[derive(Debug, Clone)]
pub struct AssetPatcher {
    manifest_asset: String,
    manifest_key: String,
    client: Option<ClientInjection>,
}

impl AssetPatcher {
    /// Patcher that only pins `manifest_key`.
    pub fn new(manifest_asset: impl Into<String>, manifest_key: impl Into<String>) -> Self {
        Self {
            manifest_asset: asset_key(&manifest_asset.into()).to_string(),
            manifest_key: manifest_key.into(),
            client: None,
        }
    }

    /// Also inject a reload client connecting to `port`.
    pub fn with_reload_client(mut self, port: u16) -> Self {
        self.client = Some(ClientInjection {
            port,
            script: RELOAD_CLIENT_JS.render(&ClientVars::new(port)),
        });
        self
    }

    pub fn patch(&self, assets: &mut AssetMap) -> PatchReport {
        let mut report = PatchReport::default();

        let mut manifest = match self.load_manifest(assets) {
            Ok(manifest) => manifest,
            Err(e) => {
                report.warnings.push(e);
                return report;
            }
        };
        report.extension_name = manifest.name.clone();

        manifest.key = Some(self.manifest_key.clone());
        if let Some(client) = &self.client {
            report.csp = manifest.allow_connect(&origin(client.port));
            report.background_scripts = manifest.add_background_script(CLIENT_ASSET);
        }

        match manifest.to_vec_pretty() {
            Ok(bytes) => {
                assets.insert(self.manifest_asset.clone(), bytes);
                report.manifest_patched = true;
            }
            Err(e) => {
                report
                    .warnings
                    .push(AssetError::ManifestInvalid(self.manifest_asset.clone(), e));
                return report;
            }
        }

        if let Some(client) = &self.client {
            self.inject_client(client, &manifest, assets, &mut report);
        }

        report
    }

    fn load_manifest(&self, assets: &AssetMap) -> Result<Manifest, AssetError> {
        let bytes = assets
            .get(&self.manifest_asset)
            .ok_or_else(|| AssetError::ManifestMissing(self.manifest_asset.clone()))?;
        Manifest::from_slice(bytes)
            .map_err(|e| AssetError::ManifestInvalid(self.manifest_asset.clone(), e))
    }

    fn inject_client(
        &self,
        client: &ClientInjection,
        manifest: &Manifest,
        assets: &mut AssetMap,
        report: &mut PatchReport,
    ) {
        assets.insert(CLIENT_ASSET.to_string(), client.script.clone().into_bytes());

        let tag = script_tag();
        for (path, content) in assets.iter_mut() {
            if !is_html(path) {
                continue;
            }
            if let Some(patched) = inject_script(content, &tag) {
                *content = patched;
            }
            report.pages_injected.push(path.clone());
        }
        report.pages_injected.sort();

        report.ui_pages = [manifest.popup_page(), manifest.options_page()]
            .into_iter()
            .flatten()
            .map(asset_key)
            .filter(|page| report.pages_injected.iter().any(|p| p == page))
            .map(str::to_string)
            .collect();

        if let Some(worker) = manifest.service_worker() {
            let worker = asset_key(worker);
            match assets.get_mut(worker) {
                Some(bundle) => {
                    if !bundle.starts_with(CLIENT_MARKER.as_bytes()) {
                        let mut patched = Vec::with_capacity(client.script.len() + 1 + bundle.len());
                        patched.extend_from_slice(client.script.as_bytes());
                        patched.push(b'\n');
                        patched.extend_from_slice(bundle);
                        *bundle = patched;
                    }
                    report.worker_injected = true;
                }
                None => report
                    .warnings
                    .push(AssetError::WorkerMissing(worker.to_string())),
            }
        }
    }
}

/// Manifest paths may be written `/x.js` or `./x.js`; asset keys are `x.js`.
fn asset_key(path: &str) -> &str {
    path.trim_start_matches("./").trim_start_matches('/')
}
