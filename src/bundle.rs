//! Bundler output adapter.
//!
//! Without a bundler plugin host, a "compilation" is whatever the bundler
//! last wrote into the source directory. Each run loads that directory into
//! an [`AssetMap`], and after patching mirrors it into the unpacked
//! extension directory the browser loads.
//!
//! Only files whose bytes differ are rewritten, so an unchanged compilation
//! touches nothing and triggers no reload.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::patch::AssetMap;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("build output `{}` does not exist", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to walk `{}`", .0.display())]
    Walk(PathBuf, #[source] jwalk::Error),

    #[error("failed to read `{}`", .0.display())]
    Read(PathBuf, #[source] io::Error),

    #[error("failed to write `{}`", .0.display())]
    Write(PathBuf, #[source] io::Error),
}

/// Outcome of [`OutputMirror::commit`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorStats {
    pub written: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl MirrorStats {
    pub fn changed(&self) -> bool {
        self.written > 0 || self.removed > 0
    }
}

pub struct OutputMirror {
    source: PathBuf,
    dest: PathBuf,
    /// Files written by the previous commit, for stale-file removal.
    written: FxHashSet<String>,
}

impl OutputMirror {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            written: FxHashSet::default(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Read every file under the source directory.
    pub fn load(&self) -> Result<AssetMap, BundleError> {
        if !self.source.is_dir() {
            return Err(BundleError::MissingSource(self.source.clone()));
        }

        let mut assets = AssetMap::default();
        for entry in WalkDir::new(&self.source).skip_hidden(false) {
            let entry = entry.map_err(|e| BundleError::Walk(self.source.clone(), e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(key) = asset_key(&self.source, &path) else {
                continue;
            };
            let bytes = fs::read(&path).map_err(|e| BundleError::Read(path.clone(), e))?;
            assets.insert(key, bytes);
        }
        Ok(assets)
    }

    /// Write changed assets into the destination and remove files the
    /// previous commit wrote that are no longer part of the build.
    pub fn commit(&mut self, assets: &AssetMap) -> Result<MirrorStats, BundleError> {
        let mut stats = MirrorStats::default();

        for (key, bytes) in assets {
            let path = self.dest.join(key);
            if fs::read(&path).is_ok_and(|existing| existing == *bytes) {
                stats.unchanged += 1;
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| BundleError::Write(parent.to_path_buf(), e))?;
            }
            fs::write(&path, bytes).map_err(|e| BundleError::Write(path.clone(), e))?;
            stats.written += 1;
        }

        for stale in self.written.iter().filter(|k| !assets.contains_key(*k)) {
            let path = self.dest.join(stale);
            match fs::remove_file(&path) {
                Ok(()) => stats.removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(BundleError::Write(path, e)),
            }
        }

        self.written = assets.keys().cloned().collect();
        Ok(stats)
    }
}

/// Forward-slash path of `path` relative to `root`.
fn asset_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
