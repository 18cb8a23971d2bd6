//! `extreload id` and `extreload rotate-key`.

use anyhow::{Context, Result};

use crate::config::ExtReloadConfig;
use crate::identity::{ExtensionIdentity, get_or_create_identity, key_path, rotate_identity};

/// Print the pinned extension id and manifest key, creating them on first use.
pub fn print_identity(config: &ExtReloadConfig) -> Result<()> {
    let identity = get_or_create_identity(&config.extension.cache_dir)
        .context("failed to load extension identity")?;
    print(&identity);
    Ok(())
}

/// Replace the cached key. Installed copies of the extension keep the old id.
pub fn rotate_key(config: &ExtReloadConfig) -> Result<()> {
    let cache_dir = &config.extension.cache_dir;
    let previous = key_path(cache_dir)
        .exists()
        .then(|| get_or_create_identity(cache_dir))
        .transpose()
        .context("failed to load extension identity")?;

    let identity = rotate_identity(cache_dir).context("failed to rotate extension key")?;
    if let Some(previous) = previous {
        crate::warn!("identity"; "extension id changed from {}", previous.extension_id());
    }
    print(&identity);
    Ok(())
}

fn print(identity: &ExtensionIdentity) {
    println!("id:  {}", identity.extension_id());
    println!("key: {}", identity.manifest_key());
}
