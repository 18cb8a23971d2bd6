//! `[reload]`, `[extension]` and `[browser]` sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// [reload]
// ============================================================================

/// How reloads reach the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Injected client listening on the live-reload socket
    #[default]
    Socket,
    /// Remote-debugging protocol, nothing injected
    Devtools,
}

/// Live-reload server settings.
///
/// # Example
/// ```toml
/// [reload]
/// port = 8081
/// strategy = "socket"
/// debounce_ms = 1000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadSection {
    /// First port tried for the live-reload socket.
    pub port: u16,
    pub strategy: Strategy,
    /// Quiet period after the last compilation before reloading.
    pub debounce_ms: u64,
    pub verbose: bool,
}

impl Default for ReloadSection {
    fn default() -> Self {
        Self {
            port: 8081,
            strategy: Strategy::Socket,
            debounce_ms: 1000,
            verbose: false,
        }
    }
}

impl ReloadSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ============================================================================
// [extension]
// ============================================================================

/// Where the build comes from and where the patched extension goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionSection {
    /// Bundler output directory (watched).
    pub source: PathBuf,
    /// Unpacked extension directory loaded by the browser.
    pub dir: PathBuf,
    /// Manifest file name inside the build.
    pub manifest: String,
    /// Key and browser profile location.
    pub cache_dir: PathBuf,
}

impl Default for ExtensionSection {
    fn default() -> Self {
        Self {
            source: "dist".into(),
            dir: "dist-dev".into(),
            manifest: "manifest.json".into(),
            cache_dir: ".extreload".into(),
        }
    }
}

impl ExtensionSection {
    /// The patched manifest on disk.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(&self.manifest)
    }

    /// Isolated browser profile for launched browsers.
    pub fn profile_dir(&self) -> PathBuf {
        self.cache_dir.join("profile")
    }
}

// ============================================================================
// [browser]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// Start a browser after a build when none is attached.
    pub auto_launch: bool,
    /// Extension page opened by a launched browser.
    pub open_page: String,
    /// Browser binary; `~` and `$VAR` are expanded.
    pub executable: Option<PathBuf>,
    pub remote_debug_port: u16,
    /// How long after the last client left a browser still counts as attached.
    pub grace_period_ms: u64,
    /// Bound on every debug-protocol request.
    pub debug_timeout_ms: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            auto_launch: false,
            open_page: "options.html".into(),
            executable: None,
            remote_debug_port: 9222,
            grace_period_ms: 2000,
            debug_timeout_ms: 5000,
        }
    }
}

impl BrowserSection {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn debug_timeout(&self) -> Duration {
        Duration::from_millis(self.debug_timeout_ms)
    }
}
