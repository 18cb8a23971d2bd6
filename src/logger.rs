//! Leveled, colored terminal logging.
//!
//! - `log!` / `debug!` print `[component] message` (debug only with `--verbose`)
//! - `warn!` / `error!` add a level tag and color the prefix accordingly
//! - `WatchStatus` keeps a single overwritable status block for `dev` mode
//!
//! # Example
//!
//! ```ignore
//! log!("reload"; "listening on ws://localhost:{}", port);
//! warn!("patch"; "manifest.json not found, skipping");
//! debug!("ws"; "client {} connected", id);
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose or `reload.verbose`)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log severity, selects the prefix color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored component prefix
///
/// # Usage
/// ```ignore
/// log!("component"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($crate::logger::Level::Info, $module, &format!($($arg)*))
    }};
}

/// Log a warning (recoverable problem, work continues)
#[macro_export]
macro_rules! warn {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($crate::logger::Level::Warn, $module, &format!($($arg)*))
    }};
}

/// Log an error (the current operation was abandoned)
#[macro_export]
macro_rules! error {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($crate::logger::Level::Error, $module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($crate::logger::Level::Debug, $module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Write one log line to stdout.
pub fn log(level: Level, module: &str, message: &str) {
    let line = format_line(level, module, message);
    status_detach();

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{line}").ok();
    stdout.flush().ok();
}

fn format_line(level: Level, module: &str, message: &str) -> String {
    let prefix = colorize_prefix(level, module);
    match level {
        Level::Warn => format!("{prefix} {} {message}", "warning:".yellow()),
        Level::Error => format!("{prefix} {} {message}", "error:".red()),
        Level::Info | Level::Debug => format!("{prefix} {message}"),
    }
}

/// Apply color to a component prefix based on level and component
fn colorize_prefix(level: Level, module: &str) -> String {
    let prefix = format!("[{module}]");
    match level {
        Level::Error => prefix.bright_red().bold().to_string(),
        Level::Warn => prefix.bright_yellow().bold().to_string(),
        Level::Debug => prefix.dimmed().to_string(),
        Level::Info => match module {
            "reload" | "ws" => prefix.bright_blue().bold().to_string(),
            "watch" => prefix.bright_green().bold().to_string(),
            _ => prefix.bright_cyan().bold().to_string(),
        },
    }
}

// ============================================================================
// Watch Status (single-line status with overwrite)
// ============================================================================

/// Current UTC time formatted as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `err` followed by each of its sources, `: `-separated.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

/// Status display for watch mode.
///
/// Each compile result overwrites the previous one so the terminal shows a
/// single current block instead of a growing scrollback of rebuilds.
pub struct WatchStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display unchanged message (dimmed, no symbol).
    pub fn unchanged(&mut self, message: &str) {
        self.display(String::new(), &format!("{}", message.dimmed()));
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        let line = if symbol.is_empty() {
            format!("{timestamp} {message}")
        } else {
            format!("{timestamp} {symbol} {message}")
        };

        writeln!(stdout, "{line}").ok();
        stdout.flush().ok();

        self.last_lines = line_count(message);
    }

    /// Forget the previous block so the next status starts on a fresh line.
    ///
    /// Every regular log line detaches, otherwise the next status would
    /// move the cursor up over it.
    pub fn detach(&mut self) {
        self.last_lines = 0;
    }
}

impl Default for WatchStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

fn with_status(f: impl FnOnce(&mut WatchStatus)) {
    f(&mut WATCH_STATUS.lock());
}

/// Global watch status: success
pub fn status_success(message: &str) {
    with_status(|s| s.success(message));
}

/// Global watch status: unchanged
pub fn status_unchanged(message: &str) {
    with_status(|s| s.unchanged(message));
}

/// Global watch status: error
pub fn status_error(summary: &str, detail: &str) {
    with_status(|s| s.error(summary, detail));
}

/// Global watch status: stop overwriting the last block
pub fn status_detach() {
    with_status(WatchStatus::detach);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_status_new() {
        let status = WatchStatus::new();
        assert_eq!(status.last_lines, 0);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count("patched 3 assets"), 1);
        assert_eq!(line_count("patch failed\nmanifest.json: expected value"), 2);
    }

    #[test]
    fn test_detach_resets_overwrite() {
        let mut status = WatchStatus { last_lines: 3 };
        status.detach();
        assert_eq!(status.last_lines, 0);
    }

    #[test]
    fn test_error_chain() {
        let inner = std::io::Error::other("connection refused");
        let outer = crate::config::ConfigError::Io("extreload.toml".into(), inner);
        assert_eq!(
            error_chain(&outer),
            "IO error when reading `extreload.toml`: connection refused"
        );
    }

    #[test]
    fn test_format_line_levels() {
        owo_colors::set_override(false);
        assert_eq!(format_line(Level::Info, "reload", "ready"), "[reload] ready");
        assert_eq!(
            format_line(Level::Warn, "patch", "no manifest"),
            "[patch] warning: no manifest"
        );
        assert_eq!(
            format_line(Level::Error, "launch", "spawn failed"),
            "[launch] error: spawn failed"
        );
    }
}
