//! Browser launching.
//!
//! After a build, when no browser has the extension loaded, start one with
//! the unpacked extension and an isolated profile. A launched browser takes
//! a while to load the extension and connect back, so launches are also
//! spaced by a settle window; otherwise a second build landing in that gap
//! would start a second browser.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Minimum spacing between two launches.
pub const LAUNCH_SETTLE: Duration = Duration::from_secs(15);

/// Checked on `PATH` in order.
const BROWSER_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Checked after `PATH`, in order.
#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(windows)]
const INSTALL_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

#[cfg(not(any(target_os = "macos", windows)))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

/// Failure to start a browser. Logged; the build carries on.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("configured browser `{}` does not exist", .0.display())]
    ConfiguredMissing(PathBuf),

    #[error("no Chrome or Chromium found (set `browser.executable` or CHROME_PATH)")]
    NotFound,

    #[error("failed to start `{}`", .0.display())]
    Spawn(PathBuf, #[source] io::Error),
}

/// Everything needed to build the browser command line.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit executable, already `~`/env expanded.
    pub executable: Option<PathBuf>,
    /// Unpacked extension directory passed to `--load-extension`.
    pub extension_dir: PathBuf,
    /// Isolated `--user-data-dir`.
    pub profile_dir: PathBuf,
    pub extension_id: String,
    /// Extension page opened on start, e.g. `options.html`.
    pub open_page: String,
    /// Set for the devtools strategy only.
    pub remote_debug_port: Option<u16>,
}

impl LaunchOptions {
    pub fn start_url(&self) -> String {
        format!(
            "chrome-extension://{}/{}",
            self.extension_id,
            self.open_page.trim_start_matches('/')
        )
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut load_extension = OsString::from("--load-extension=");
        load_extension.push(&self.extension_dir);
        let mut user_data_dir = OsString::from("--user-data-dir=");
        user_data_dir.push(&self.profile_dir);

        let mut args = vec![
            load_extension,
            user_data_dir,
            "--no-first-run".into(),
            "--no-default-browser-check".into(),
        ];
        if let Some(port) = self.remote_debug_port {
            args.push(format!("--remote-debugging-port={port}").into());
        }
        args.push(self.start_url().into());
        args
    }
}

pub struct LaunchManager {
    options: LaunchOptions,
    last_launch: Option<Instant>,
    /// Last browser we started, until it is seen to exit.
    child: Option<Child>,
}

impl LaunchManager {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            last_launch: None,
            child: None,
        }
    }

    /// Collect the launched browser if it has exited. Returns whether it
    /// is still running.
    pub fn reap(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                crate::debug!("launch"; "browser exited ({})", status);
                self.child = None;
                false
            }
            Err(e) => {
                crate::debug!("launch"; "cannot poll browser: {}", e);
                self.child = None;
                false
            }
        }
    }

    pub fn start_url(&self) -> String {
        self.options.start_url()
    }

    /// Launch unless a browser is attached or one was started recently.
    pub fn should_launch(&self, attached: bool, now: Instant) -> bool {
        if attached {
            return false;
        }
        self.last_launch
            .is_none_or(|t| now.saturating_duration_since(t) >= LAUNCH_SETTLE)
    }

    /// Returns whether a browser was started.
    pub fn maybe_launch(&mut self, attached: bool, now: Instant) -> Result<bool, LaunchError> {
        self.reap();
        if !self.should_launch(attached, now) {
            crate::debug!("launch"; "browser attached or starting, not launching");
            return Ok(false);
        }
        // Stamp before spawning so a failing executable is not retried on
        // every build.
        self.last_launch = Some(now);
        self.child = Some(self.launch()?);
        Ok(true)
    }

    fn launch(&self) -> Result<Child, LaunchError> {
        let executable = find_executable(
            self.options.executable.as_deref(),
            std::env::var_os("CHROME_PATH"),
        )?;
        crate::debug!("launch"; "{} {:?}", executable.display(), self.options.args());

        let mut cmd = Command::new(&executable);
        cmd.args(self.options.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group: Ctrl+C in the terminal leaves the browser open
            cmd.process_group(0);
        }

        cmd.spawn().map_err(|e| LaunchError::Spawn(executable, e))
    }
}

/// Configured path, else `CHROME_PATH`, else `PATH`, else install locations.
pub fn find_executable(
    configured: Option<&Path>,
    chrome_path: Option<OsString>,
) -> Result<PathBuf, LaunchError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        // Bare names like `chromium` are looked up on PATH
        if path.components().count() == 1
            && let Ok(found) = which::which(path)
        {
            return Ok(found);
        }
        return Err(LaunchError::ConfiguredMissing(path.to_path_buf()));
    }

    if let Some(path) = chrome_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    BROWSER_NAMES
        .iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| {
            INSTALL_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
        })
        .ok_or(LaunchError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(remote_debug_port: Option<u16>) -> LaunchOptions {
        LaunchOptions {
            executable: None,
            extension_dir: PathBuf::from("/work/dist-dev"),
            profile_dir: PathBuf::from("/work/.extreload/profile"),
            extension_id: "abcdefghijklmnopabcdefghijklmnop".into(),
            open_page: "options.html".into(),
            remote_debug_port,
        }
    }

    #[test]
    fn test_args() {
        let args = options(None).args();
        assert_eq!(
            args,
            vec![
                OsString::from("--load-extension=/work/dist-dev"),
                "--user-data-dir=/work/.extreload/profile".into(),
                "--no-first-run".into(),
                "--no-default-browser-check".into(),
                "chrome-extension://abcdefghijklmnopabcdefghijklmnop/options.html".into(),
            ]
        );
    }

    #[test]
    fn test_args_with_debug_port() {
        let args = options(Some(9222)).args();
        assert!(args.contains(&OsString::from("--remote-debugging-port=9222")));
        assert_eq!(
            args.last().unwrap(),
            "chrome-extension://abcdefghijklmnopabcdefghijklmnop/options.html"
        );
    }

    #[test]
    fn test_start_url_strips_leading_slash() {
        let mut opts = options(None);
        opts.open_page = "/popup.html".into();
        assert_eq!(
            opts.start_url(),
            "chrome-extension://abcdefghijklmnopabcdefghijklmnop/popup.html"
        );
    }

    #[test]
    fn test_should_launch_respects_attached_and_settle_window() {
        let t0 = Instant::now();
        let mut manager = LaunchManager::new(options(None));

        assert!(manager.should_launch(false, t0));
        assert!(!manager.should_launch(true, t0));

        manager.last_launch = Some(t0);
        assert!(!manager.should_launch(false, t0 + Duration::from_secs(5)));
        assert!(manager.should_launch(false, t0 + LAUNCH_SETTLE));
    }

    #[test]
    fn test_reconnect_within_grace_does_not_relaunch() {
        use crate::reload::ReloadSession;
        use tokio::sync::mpsc;

        let grace = Duration::from_millis(2000);
        let t0 = Instant::now();
        let mut manager = LaunchManager::new(options(None));
        let mut session = ReloadSession::new();

        // First launch happened long ago; a client connected, then dropped
        manager.last_launch = Some(t0);
        let (tx, _rx) = mpsc::unbounded_channel();
        session.connect(1, "127.0.0.1:1".parse().unwrap(), tx);
        let left = t0 + Duration::from_secs(60);
        session.disconnect(1, left);

        // Page reload reconnects within the grace period
        let soon = left + Duration::from_millis(500);
        assert!(!manager.should_launch(session.is_connected(soon, grace), soon));

        // Browser closed for good
        let later = left + Duration::from_millis(2500);
        assert!(manager.should_launch(session.is_connected(later, grace), later));
    }

    #[test]
    fn test_find_executable_prefers_configured() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("my-chrome");
        std::fs::write(&exe, "").unwrap();

        let found = find_executable(Some(&exe), Some("/elsewhere/chrome".into())).unwrap();
        assert_eq!(found, exe);

        let missing = dir.path().join("nope");
        assert!(matches!(
            find_executable(Some(&missing), None),
            Err(LaunchError::ConfiguredMissing(p)) if p == missing
        ));
    }

    #[test]
    fn test_find_executable_uses_chrome_path() {
        let found = find_executable(None, Some("/opt/chrome/chrome".into())).unwrap();
        assert_eq!(found, PathBuf::from("/opt/chrome/chrome"));
    }

    #[test]
    fn test_failed_spawn_is_reported_and_stamped() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(None);
        // A directory exists but cannot be executed
        opts.executable = Some(dir.path().to_path_buf());
        let mut manager = LaunchManager::new(opts);

        let t0 = Instant::now();
        assert!(matches!(
            manager.maybe_launch(false, t0),
            Err(LaunchError::Spawn(..))
        ));
        assert!(!manager.maybe_launch(false, t0).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_browser_is_reaped() {
        let mut opts = options(None);
        // Rejects the browser flags and exits at once
        opts.executable = Some(PathBuf::from("sh"));
        let mut manager = LaunchManager::new(opts);
        assert!(!manager.reap());

        assert!(manager.maybe_launch(false, Instant::now()).unwrap());
        assert!(manager.child.is_some());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while manager.reap() {
            assert!(std::time::Instant::now() < deadline, "child never exited");
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(manager.child.is_none());
    }
}
