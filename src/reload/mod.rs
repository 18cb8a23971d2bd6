//! Live-reload transport.
//!
//! ```text
//! build done --> ReloadActor --(debounce)--> ReloadStrategy
//!                    ^                          |- SocketPush:    `reload` to every open client
//!                    |                          '- DevToolsDriven: Runtime.evaluate / Page.reload
//!                    '---- ws connections (connect / disconnect)
//! ```
//!
//! - `message` - wire frames
//! - `server` - listener with port retry
//! - `session` - connected clients and the disconnect grace period
//! - `debounce` - single pending reload timer
//! - `strategy` - the two reload strategies

pub mod debounce;
pub mod message;
pub mod server;
pub mod session;
pub mod strategy;

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

pub use debounce::PendingReload;
pub use message::{ClientFrame, ServerFrame};
pub use server::ReloadServer;
pub use session::{ClientId, ReloadSession};
pub use strategy::{DevToolsDriven, ReloadStrategy, SocketPush};

/// Live-reload socket failures. Logged; the affected connection is dropped.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot bind live-reload server on 127.0.0.1:{first}..={last}")]
    Bind {
        first: u16,
        last: u16,
        #[source]
        source: io::Error,
    },

    #[error("websocket handshake with {0} failed")]
    Handshake(SocketAddr, #[source] tungstenite::Error),

    #[error("connection to {0} lost")]
    Connection(SocketAddr, #[source] tungstenite::Error),
}

impl TransportError {
    /// A page reloading or a worker being suspended drops its socket
    /// without a close handshake; that is not worth a warning.
    pub fn is_routine_close(&self) -> bool {
        use tungstenite::error::ProtocolError;

        match self {
            Self::Connection(_, err) => match err {
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
                tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
                tungstenite::Error::Io(e) => matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::BrokenPipe
                ),
                _ => false,
            },
            _ => false,
        }
    }
}
