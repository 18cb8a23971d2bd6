//! Configuration utility functions.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::ConfigError;

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`
/// Returns the path to the config file if found
///
/// # Example
/// ```text
/// /home/user/ext/src/popup/     ← start
/// /home/user/ext/extreload.toml ← found!
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    // Absolute paths are taken as given
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }

        // Move to parent directory
        match current.parent() {
            Some(parent) => current = parent,
            None => return None, // Reached filesystem root
        }
    }
}

/// Expand `~` and resolve against `root` when relative.
pub fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    };
    if expanded.is_relative() {
        root.join(expanded)
    } else {
        expanded
    }
}

/// Like [`resolve_path`], also expanding `$VAR` / `${VAR}`.
pub fn resolve_executable(path: &Path, root: &Path) -> Result<PathBuf, ConfigError> {
    let Some(s) = path.to_str() else {
        return Ok(resolve_path(path, root));
    };
    let expanded: Cow<'_, str> = shellexpand::full(s)
        .map_err(|e| ConfigError::Validation(format!("browser.executable: {e}")))?;

    let expanded = PathBuf::from(expanded.into_owned());
    // Bare names like `chromium` are looked up on PATH, not under root
    if expanded.is_relative() && expanded.components().count() > 1 {
        Ok(root.join(expanded))
    } else {
        Ok(expanded)
    }
}

// ============================================================================
// tests
// ============================================================================
