//! Configuration management for `extreload.toml`.
//!
//! The file is optional: without one every setting has a default and paths
//! resolve against the current directory.
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[reload]`    | Socket port, strategy, debounce, verbosity       |
//! | `[extension]` | Build output, unpacked dir, manifest, cache dir  |
//! | `[browser]`   | Auto-launch, start page, executable, debug port  |

mod error;
mod section;
mod util;

pub use error::ConfigError;
pub use section::{BrowserSection, ExtensionSection, ReloadSection, Strategy};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use util::{find_config_file, resolve_executable, resolve_path};

use crate::cli::{Cli, Commands, ExtensionArgs};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing extreload.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtReloadConfig {
    /// Absolute path to the config file, empty when none was found
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root: the config file's directory, else the cwd
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub reload: ReloadSection,

    #[serde(default)]
    pub extension: ExtensionSection,

    #[serde(default)]
    pub browser: BrowserSection,
}

impl ExtReloadConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file, applies CLI overrides,
    /// resolves paths against the project root, then validates.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(PathBuf::from("."), e))?;

        let mut config = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        config.apply_command_options(cli);
        config.finalize()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_with_ignored(content, Path::new("<string>")).map(|(config, _)| config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content, path)?;
        if !ignored.is_empty() {
            crate::warn!("config"; "unknown fields in {} ignored: {}",
                path.display(), ignored.join(", "));
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str, path: &Path) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |field: serde_ignored::Path| {
            ignored.push(field.to_string());
        })
        .map_err(|e| ConfigError::Toml(path.to_path_buf(), e))?;
        Ok((config, ignored))
    }

    /// Resolve paths and validate.
    pub fn finalize(&mut self) -> Result<(), ConfigError> {
        self.normalize_paths()?;
        self.validate()
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        if cli.verbose {
            self.reload.verbose = true;
        }

        match &cli.command {
            Commands::Dev { args } => {
                self.apply_extension_args(&args.extension);
                Self::update_option(&mut self.reload.port, args.port.as_ref());
                Self::update_option(&mut self.reload.strategy, args.strategy.as_ref());
                Self::update_option(&mut self.reload.debounce_ms, args.debounce.as_ref());
                Self::update_option(&mut self.browser.auto_launch, args.launch.as_ref());
                Self::update_option(&mut self.browser.open_page, args.open.as_ref());
            }
            Commands::Patch { args } => {
                self.apply_extension_args(&args.extension);
                Self::update_option(&mut self.reload.port, args.port.as_ref());
                Self::update_option(&mut self.reload.strategy, args.strategy.as_ref());
            }
            Commands::Id | Commands::RotateKey => {}
        }
    }

    fn apply_extension_args(&mut self, args: &ExtensionArgs) {
        Self::update_option(&mut self.extension.source, args.source.as_ref());
        Self::update_option(&mut self.extension.dir, args.dir.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve every path against the project root.
    fn normalize_paths(&mut self) -> Result<(), ConfigError> {
        let root = &self.root;
        self.extension.source = resolve_path(&self.extension.source, root);
        self.extension.dir = resolve_path(&self.extension.dir, root);
        self.extension.cache_dir = resolve_path(&self.extension.cache_dir, root);
        if let Some(exe) = self.browser.executable.take() {
            self.browser.executable = Some(resolve_executable(&exe, root)?);
        }
        Ok(())
    }

    // ========================================================================
    // validation
    // ========================================================================

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if self.reload.port == 0 {
            return invalid("reload.port must not be 0".into());
        }
        if self.reload.debounce_ms == 0 {
            return invalid("reload.debounce_ms must be greater than 0".into());
        }
        if self.browser.grace_period_ms == 0 {
            return invalid("browser.grace_period_ms must be greater than 0".into());
        }
        if self.browser.debug_timeout_ms == 0 {
            return invalid("browser.debug_timeout_ms must be greater than 0".into());
        }
        if self.extension.manifest.trim().is_empty() {
            return invalid("extension.manifest must not be empty".into());
        }

        let ext = &self.extension;
        if ext.source == ext.dir {
            return invalid(format!(
                "extension.source and extension.dir are both `{}`; the patched copy needs its own directory",
                ext.dir.display()
            ));
        }
        if ext.dir.starts_with(&ext.source) {
            return invalid(format!(
                "extension.dir `{}` is inside extension.source `{}`",
                ext.dir.display(),
                ext.source.display()
            ));
        }
        Ok(())
    }
}
