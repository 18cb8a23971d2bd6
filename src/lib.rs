//! extreload - live reload for browser extensions during development.
//!
//! Pins the extension identity, patches each build so it can reload
//! itself (or drives reloads over the remote-debugging protocol), and
//! restores page state across reloads.

pub mod actor;
pub mod bundle;
pub mod cli;
pub mod config;
pub mod core;
pub mod devtools;
pub mod embed;
pub mod identity;
pub mod launch;
pub mod logger;
pub mod manifest;
pub mod patch;
pub mod plugin;
pub mod reload;
pub mod snapshot;

pub use config::ExtReloadConfig;
pub use identity::{ExtensionIdentity, get_or_create_identity};
pub use patch::{AssetMap, AssetPatcher, PatchReport};
pub use plugin::DevReloadPlugin;
