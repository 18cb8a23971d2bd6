//! Actor Message Definitions
//!
//! ```text
//! FsActor --Compile--> dev loop --BuildDone--> ReloadActor <--Client*-- ws connections
//! ```

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tungstenite::protocol::Message;

use crate::reload::ClientId;

// =============================================================================
// ReloadActor Messages
// =============================================================================

/// Messages to the reload actor
#[derive(Debug)]
pub enum ReloadMsg {
    /// A compilation changed assets; (re)start the debounce timer
    AssetsChanged,
    /// A compilation finished; reload if it changed anything, then
    /// check whether a browser needs launching
    BuildDone { changed: bool },
    /// Handshake finished; `tx` feeds the connection's socket
    ClientConnected {
        id: ClientId,
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<Message>,
    },
    /// Connection task exited
    ClientDisconnected { id: ClientId },
    /// Close every client and stop
    Shutdown,
}

// =============================================================================
// Watcher Messages
// =============================================================================

/// Messages from the output watcher to the dev loop
#[derive(Debug)]
pub enum WatchMsg {
    /// Bundler output settled; run one compilation
    Compile { changed_files: usize },
}
