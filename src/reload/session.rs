//! Connected reload clients.
//!
//! Owned by the reload actor and mutated only from its message loop.

use std::net::SocketAddr;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tungstenite::protocol::Message;

use super::message::ServerFrame;

pub type ClientId = u64;

/// Outgoing half of one client connection.
///
/// The connection task drops the receiving end as soon as the socket stops
/// being usable, which is what "open" means here.
#[derive(Debug)]
struct ClientHandle {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Message>,
}

impl ClientHandle {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[derive(Debug, Default)]
pub struct ReloadSession {
    clients: FxHashMap<ClientId, ClientHandle>,
    last_disconnect: Option<Instant>,
}

impl ReloadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, id: ClientId, addr: SocketAddr, tx: mpsc::UnboundedSender<Message>) {
        self.clients.insert(id, ClientHandle { addr, tx });
        crate::debug!("ws"; "client {} connected from {} (total: {})", id, addr, self.clients.len());
    }

    /// Forget a client and stamp the disconnect time. Unknown ids are ignored.
    pub fn disconnect(&mut self, id: ClientId, now: Instant) -> bool {
        let Some(client) = self.clients.remove(&id) else {
            return false;
        };
        self.last_disconnect = Some(now);
        crate::debug!("ws"; "client {} ({}) disconnected (total: {})", id, client.addr, self.clients.len());
        true
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.clients.values().filter(|c| c.is_open()).count()
    }

    pub fn last_disconnect(&self) -> Option<Instant> {
        self.last_disconnect
    }

    /// A browser counts as attached while any client is open, and for
    /// `grace` after the last one left (a reload briefly drops every client).
    pub fn is_connected(&self, now: Instant, grace: Duration) -> bool {
        self.open_count() > 0
            || self
                .last_disconnect
                .is_some_and(|t| now.saturating_duration_since(t) < grace)
    }

    /// Send `frame` to every open client. Returns how many received it.
    pub fn broadcast(&self, frame: ServerFrame) -> usize {
        if self.clients.is_empty() {
            crate::debug!("ws"; "no clients connected");
            return 0;
        }

        let mut sent = 0;
        for (id, client) in &self.clients {
            if !client.is_open() || client.tx.send(frame.to_message()).is_err() {
                crate::debug!("ws"; "skip client {} ({}): not open", id, client.addr);
                continue;
            }
            sent += 1;
        }
        crate::debug!("ws"; "{} sent to {}/{} clients", frame.as_str(), sent, self.clients.len());
        sent
    }

    /// Ask every connection to close and forget them.
    pub fn close_all(&mut self) {
        for (_, client) in self.clients.drain() {
            let _ = client.tx.send(Message::Close(None));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    const GRACE: Duration = Duration::from_millis(2000);

    #[test]
    fn test_broadcast_skips_closed_clients() {
        let mut session = ReloadSession::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        session.connect(1, addr(), tx1);
        session.connect(2, addr(), tx2);

        drop(rx2);
        assert_eq!(session.len(), 2);
        assert_eq!(session.open_count(), 1);

        assert_eq!(session.broadcast(ServerFrame::Reload), 1);
        assert_eq!(rx1.try_recv().unwrap(), ServerFrame::Reload.to_message());
    }

    #[test]
    fn test_broadcast_without_clients() {
        let session = ReloadSession::new();
        assert_eq!(session.broadcast(ServerFrame::Reload), 0);
    }

    #[test]
    fn test_grace_period() {
        let t0 = Instant::now();
        let mut session = ReloadSession::new();
        assert!(!session.is_connected(t0, GRACE));

        let (tx, _rx) = mpsc::unbounded_channel();
        session.connect(7, addr(), tx);
        assert!(session.is_connected(t0, GRACE));

        assert!(session.disconnect(7, t0));
        assert_eq!(session.last_disconnect(), Some(t0));
        assert!(session.is_connected(t0 + Duration::from_millis(1999), GRACE));
        assert!(!session.is_connected(t0 + GRACE, GRACE));
    }

    #[test]
    fn test_unknown_disconnect_keeps_timestamp() {
        let t0 = Instant::now();
        let mut session = ReloadSession::new();
        assert!(!session.disconnect(99, t0));
        assert_eq!(session.last_disconnect(), None);
    }

    #[test]
    fn test_close_all() {
        let mut session = ReloadSession::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.connect(1, addr(), tx);

        session.close_all();
        assert!(session.is_empty());
        assert_eq!(rx.try_recv().unwrap(), Message::Close(None));
    }
}
