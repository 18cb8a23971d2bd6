//! `extreload patch`: patch the current build once.

use anyhow::{Context, Result};

use crate::bundle::{MirrorStats, OutputMirror};
use crate::config::ExtReloadConfig;
use crate::identity::get_or_create_identity;
use crate::logger::error_chain;
use crate::patch::PatchReport;
use crate::plugin::standalone_patcher;

/// Load, patch and mirror the build output without starting a server.
///
/// A fresh mirror has no record of earlier runs, so files a previous run
/// wrote are left in place.
pub fn patch_once(config: &ExtReloadConfig) -> Result<(PatchReport, MirrorStats)> {
    let identity = get_or_create_identity(&config.extension.cache_dir)
        .context("failed to load extension identity")?;
    let patcher = standalone_patcher(config, &identity);

    let mut mirror = OutputMirror::new(&config.extension.source, &config.extension.dir);
    let mut assets = mirror.load().context("failed to read build output")?;

    let report = patcher.patch(&mut assets);
    for warning in &report.warnings {
        crate::warn!("patch"; "{}", error_chain(warning));
    }

    let stats = mirror
        .commit(&assets)
        .with_context(|| format!("failed to write {}", mirror.dest().display()))?;

    crate::log!("patch"; "{} -> {}: {} written, {} removed, {} unchanged",
        mirror.source().display(), mirror.dest().display(),
        stats.written, stats.removed, stats.unchanged);
    crate::log!("patch"; "{} ({})",
        report.extension_name.as_deref().unwrap_or("unnamed extension"), report.summary());
    if !report.ui_pages.is_empty() {
        crate::log!("patch"; "reload client in {}", report.ui_pages.join(", "));
    }

    Ok((report, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use std::fs;

    #[test]
    fn test_patch_once_socket() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ExtReloadConfig::default();
        config.extension.source = dir.path().join("dist");
        config.extension.dir = dir.path().join("dist-dev");
        config.extension.cache_dir = dir.path().join(".extreload");
        config.reload.strategy = Strategy::Socket;

        fs::create_dir_all(&config.extension.source).unwrap();
        fs::write(
            config.extension.source.join("manifest.json"),
            r#"{
                "manifest_version": 3,
                "name": "Demo",
                "options_page": "options.html",
                "background": { "service_worker": "sw.js" }
            }"#,
        )
        .unwrap();
        fs::write(config.extension.source.join("sw.js"), "self.x = 1;").unwrap();
        fs::write(
            config.extension.source.join("options.html"),
            "<html><body><main></main></body></html>",
        )
        .unwrap();

        let (report, stats) = patch_once(&config).unwrap();
        assert!(report.manifest_patched);
        assert_eq!(report.ui_pages, vec!["options.html"]);
        // manifest, worker, page and the client asset
        assert_eq!(stats.written, 4);

        let page = fs::read_to_string(config.extension.dir.join("options.html")).unwrap();
        assert!(page.contains(crate::embed::client::CLIENT_ASSET));
        let worker = fs::read_to_string(config.extension.dir.join("sw.js")).unwrap();
        assert!(worker.starts_with(crate::embed::client::CLIENT_MARKER));
        assert!(worker.ends_with("self.x = 1;"));
    }

    #[test]
    fn test_patch_once_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ExtReloadConfig::default();
        config.extension.source = dir.path().join("dist");
        config.extension.dir = dir.path().join("dist-dev");
        config.extension.cache_dir = dir.path().join(".extreload");

        assert!(patch_once(&config).is_err());
    }
}
