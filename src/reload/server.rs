//! WebSocket listener for reload clients.
//!
//! Accepted sockets are handed to their own connection task, which
//! registers with the reload actor once the handshake completes.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::TransportError;
use super::session::ClientId;
use crate::actor::messages::ReloadMsg;

/// Maximum port retry attempts
pub const MAX_PORT_RETRIES: u16 = 10;

/// Running listener. Dropping it stops accepting new clients.
pub struct ReloadServer {
    port: u16,
    accept: JoinHandle<()>,
}

impl ReloadServer {
    /// Bind `127.0.0.1:<base_port>` (or one of the next ports) and start
    /// accepting clients for the actor behind `reload_tx`.
    pub async fn start(
        base_port: u16,
        reload_tx: mpsc::Sender<ReloadMsg>,
    ) -> Result<Self, TransportError> {
        let (listener, port) = try_bind_port(base_port, MAX_PORT_RETRIES).await?;
        if port != base_port && base_port != 0 {
            crate::warn!("reload"; "port {} in use, using {}", base_port, port);
        }
        crate::debug!("reload"; "listening on ws://localhost:{}", port);

        let accept = tokio::spawn(accept_loop(listener, reload_tx));
        Ok(Self { port, accept })
    }

    /// The port clients must connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn origin(&self) -> String {
        origin(self.port)
    }

    pub fn stop(&self) {
        self.accept.abort();
    }
}

impl Drop for ReloadServer {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

/// Origin the reload client connects to, as allowed in the manifest CSP.
pub fn origin(port: u16) -> String {
    format!("ws://localhost:{port}")
}

async fn accept_loop(listener: TcpListener, reload_tx: mpsc::Sender<ReloadMsg>) {
    let mut next_id: ClientId = 0;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if reload_tx.is_closed() {
                    break;
                }
                next_id += 1;
                crate::debug!("reload"; "accepted {}", addr);
                tokio::spawn(crate::actor::ws::serve_client(
                    stream,
                    addr,
                    next_id,
                    reload_tx.clone(),
                ));
            }
            Err(e) => {
                crate::log!("reload"; "accept error: {}", e);
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

/// Try binding to port, retry with incremented port if in use
async fn try_bind_port(
    base_port: u16,
    max_retries: u16,
) -> Result<(TcpListener, u16), TransportError> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await {
            Ok(listener) => {
                let actual_port = listener
                    .local_addr()
                    .map_err(|source| bind_error(base_port, max_retries, source))?
                    .port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(bind_error(
        base_port,
        max_retries,
        last_error.unwrap_or_else(|| io::Error::other("no port attempted")),
    ))
}

fn bind_error(base_port: u16, max_retries: u16, source: io::Error) -> TransportError {
    TransportError::Bind {
        first: base_port,
        last: base_port.saturating_add(max_retries.saturating_sub(1)),
        source,
    }
}
