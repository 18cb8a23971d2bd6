//! Command-line interface module.

mod args;
pub mod dev;
pub mod key;
pub mod patch;

pub use args::{Cli, Commands, DevArgs, ExtensionArgs, PatchArgs};
