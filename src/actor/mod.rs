//! Actor System for Live Reload
//!
//! Message-passing concurrency for `dev` mode, all on one current-thread
//! runtime:
//!
//! ```text
//! FsActor --> Coordinator --> ReloadActor <-- ws connections
//! (watch)    (patch, mirror)  (debounce, reload, launch)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - Build output watcher with debouncing
//! - `ws` - One task per reload client connection
//! - `reload` - Owns clients, the pending reload and the strategy
//! - `coordinator` - Wires up and runs the dev loop

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod reload;
pub mod ws;

pub use coordinator::Coordinator;
