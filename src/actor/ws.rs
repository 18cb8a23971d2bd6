//! WebSocket connection task.
//!
//! One task per reload client:
//!
//! ```text
//! ReloadActor --[Message]--> tx ==> socket ==> client
//!      ^                                         |
//!      +--- Connected / Disconnected <-- task <--+ (keepalive ignored)
//! ```
//!
//! The actor only ever holds the sending half of an unbounded channel; when
//! the socket fails the task drops the receiver, so the actor sees the client
//! as closed even before the disconnect message arrives.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tungstenite::protocol::Message;

use super::messages::ReloadMsg;
use crate::reload::{ClientFrame, ClientId, TransportError};

/// Serve one accepted connection until either side closes it.
pub async fn serve_client(
    stream: TcpStream,
    addr: SocketAddr,
    id: ClientId,
    reload_tx: mpsc::Sender<ReloadMsg>,
) {
    match run_client(stream, addr, id, &reload_tx).await {
        Ok(()) => {}
        Err(e) if e.is_routine_close() => {
            crate::debug!("ws"; "client {} dropped: {}", id, crate::logger::error_chain(&e));
        }
        Err(e) => crate::warn!("ws"; "{}", crate::logger::error_chain(&e)),
    }
}

async fn run_client(
    stream: TcpStream,
    addr: SocketAddr,
    id: ClientId,
    reload_tx: &mpsc::Sender<ReloadMsg>,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| TransportError::Handshake(addr, e))?;
    let (mut sink, mut incoming) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    if reload_tx
        .send(ReloadMsg::ClientConnected { id, addr, tx })
        .await
        .is_err()
    {
        // Actor already stopped
        let _ = sink.close().await;
        return Ok(());
    }

    let result = loop {
        tokio::select! {
            outgoing = rx.recv() => match outgoing {
                Some(msg) => {
                    let closing = matches!(msg, Message::Close(_));
                    if let Err(e) = sink.send(msg).await {
                        break Err(TransportError::Connection(addr, e));
                    }
                    if closing {
                        break Ok(());
                    }
                }
                None => break Ok(()),
            },
            frame = incoming.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientFrame::parse(text.as_str()) {
                    ClientFrame::Keepalive => {}
                    ClientFrame::Unknown(other) => {
                        crate::debug!("ws"; "client {} sent unknown frame: {}", id, other);
                    }
                },
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(TransportError::Connection(addr, e)),
            },
        }
    };

    rx.close();
    let _ = reload_tx.send(ReloadMsg::ClientDisconnected { id }).await;
    result
}
