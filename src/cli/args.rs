//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Strategy;

/// Live reload for browser extensions during development
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: extreload.toml)
    #[arg(short = 'C', long, global = true, default_value = "extreload.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch the build output and reload the extension on every change
    #[command(visible_alias = "d")]
    Dev {
        #[command(flatten)]
        args: DevArgs,
    },

    /// Patch the current build once and exit
    #[command(visible_alias = "p")]
    Patch {
        #[command(flatten)]
        args: PatchArgs,
    },

    /// Print the pinned extension id, creating the key if needed
    Id,

    /// Replace the extension key (changes the extension id)
    RotateKey,
}

/// Where the build is read from and written to.
#[derive(clap::Args, Debug, Clone)]
pub struct ExtensionArgs {
    /// Bundler output directory (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Unpacked extension directory loaded by the browser
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub dir: Option<PathBuf>,
}

/// Dev command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct DevArgs {
    #[command(flatten)]
    pub extension: ExtensionArgs,

    /// First port tried for the live-reload socket
    #[arg(short, long)]
    pub port: Option<u16>,

    /// How reloads reach the browser
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Quiet period in milliseconds before reloading
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Launch a browser with the extension loaded when none is attached
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub launch: Option<bool>,

    /// Extension page opened by a launched browser
    #[arg(short, long, value_name = "PAGE")]
    pub open: Option<String>,
}

/// Patch command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct PatchArgs {
    #[command(flatten)]
    pub extension: ExtensionArgs,

    /// Live-reload port written into the injected client
    #[arg(short, long)]
    pub port: Option<u16>,

    /// How reloads reach the browser
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,
}
