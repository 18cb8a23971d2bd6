//! Process-level state shared by the long-running commands.

mod state;

pub use state::{ShutdownSignal, setup_shutdown_handler};
