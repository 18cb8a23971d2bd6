use std::path::{Path, PathBuf};

use notify::{RecursiveMode, Watcher};

/// Keeps the build output directory watched.
///
/// Bundlers often delete and recreate their output directory on every
/// build, which silently drops an OS watch on it.
pub(super) struct WatchRoot {
    path: PathBuf,
    attached: bool,
}

impl WatchRoot {
    pub(super) fn new(path: PathBuf) -> Self {
        Self {
            path,
            attached: false,
        }
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn is_attached(&self) -> bool {
        self.attached
    }

    /// Forget the watch after the root itself was removed.
    pub(super) fn detach(&mut self) {
        self.attached = false;
    }

    /// Watch the root if it exists now.
    pub(super) fn attach(&mut self, watcher: &mut impl Watcher) -> notify::Result<()> {
        if self.path.exists() {
            watcher.watch(&self.path, RecursiveMode::Recursive)?;
            self.attached = true;
        }
        Ok(())
    }

    /// Re-attach after the root was removed and recreated.
    ///
    /// Returns `true` when a new watch was attached.
    pub(super) fn maintain(&mut self, watcher: &mut impl Watcher) -> bool {
        if !self.path.exists() {
            if self.attached {
                crate::debug!("watch"; "lost watch: {}", self.path.display());
            }
            self.attached = false;
            return false;
        }
        if self.attached {
            return false;
        }

        match watcher.watch(&self.path, RecursiveMode::Recursive) {
            Ok(()) => {
                self.attached = true;
                crate::debug!("watch"; "re-attached watch: {}", self.path.display());
                true
            }
            Err(e) => {
                crate::debug!("watch"; "cannot watch {}: {}", self.path.display(), e);
                false
            }
        }
    }
}
