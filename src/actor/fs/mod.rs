//! FileSystem Actor
//!
//! Watches the bundler's output directory and turns each settled burst of
//! writes into one compilation request.
//!
//! ```text
//! notify thread → Debouncer (timing + dedup) → WatchMsg::Compile
//! ```

use std::path::PathBuf;
use std::time::Instant;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::WatchMsg;

// Pure timing and deduplication.
mod debouncer;
// Shared fs event types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;


use debouncer::Debouncer;
use types::ChangeKind;
use watch_roots::WatchRoot;

/// FileSystem Actor - watches the build output
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    root: WatchRoot,
    watch_tx: mpsc::Sender<WatchMsg>,
    debouncer: Debouncer,
}

impl FsActor {
    /// Start watching `source` immediately.
    ///
    /// Events buffer while the caller runs the initial compilation, so
    /// writes landing in between are not lost. A missing `source` is
    /// attached as soon as it appears.
    pub fn new(source: PathBuf, watch_tx: mpsc::Sender<WatchMsg>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut root = WatchRoot::new(source);
        root.attach(&mut watcher)?;
        if !root.is_attached() {
            crate::log!("watch"; "waiting for {} to appear", root.path().display());
        }

        Ok(Self {
            notify_rx,
            watcher,
            root,
            watch_tx,
            debouncer: Debouncer::new(),
        })
    }

    /// Run the actor event loop until the receiver side goes away.
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut root,
            watch_tx,
            mut debouncer,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify delivers on its own thread; bridge into the runtime
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            let sleep = debouncer.sleep_duration(Instant::now());
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => {
                    if removes_root(&event, &root) {
                        root.detach();
                    }
                    debouncer.add_event(&event, Instant::now());
                }
                () = tokio::time::sleep(sleep) => {
                    let msg = if root.maintain(&mut watcher) {
                        // Root (re)appeared; whatever is in it is new
                        Some(WatchMsg::Compile { changed_files: 0 })
                    } else {
                        debouncer.take_if_ready(Instant::now()).map(|changes| {
                            log_changes(&changes);
                            WatchMsg::Compile { changed_files: changes.len() }
                        })
                    };

                    if let Some(msg) = msg
                        && watch_tx.send(msg).await.is_err()
                    {
                        break;
                    }
                }
            }
        }
        crate::debug!("watch"; "stopped");
    }
}

fn removes_root(event: &notify::Event, root: &WatchRoot) -> bool {
    matches!(ChangeKind::from_event(&event.kind), Some(ChangeKind::Removed))
        && event.paths.iter().any(|p| p == root.path())
}

fn log_changes(changes: &rustc_hash::FxHashMap<PathBuf, ChangeKind>) {
    if changes.len() == 1
        && let Some((path, kind)) = changes.iter().next()
    {
        crate::debug!("watch"; "{} {}", kind.label(), path.display());
    } else {
        crate::debug!("watch"; "{} files changed", changes.len());
    }
}
