//! Reload Actor
//!
//! Owns every piece of mutable reload state: the connected clients, the
//! single pending reload timer, the strategy, and the browser launcher.
//! All of it is touched only from this loop, so "cancel the old timer and
//! start a new one" happens within one turn.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::messages::ReloadMsg;
use crate::launch::LaunchManager;
use crate::reload::{PendingReload, ReloadSession, ReloadStrategy};

pub struct ReloadActor {
    rx: mpsc::Receiver<ReloadMsg>,
    session: ReloadSession,
    pending: PendingReload,
    debounce: Duration,
    strategy: Box<dyn ReloadStrategy>,
    launcher: Option<LaunchManager>,
}

impl ReloadActor {
    pub fn new(
        rx: mpsc::Receiver<ReloadMsg>,
        strategy: Box<dyn ReloadStrategy>,
        debounce: Duration,
    ) -> Self {
        Self {
            rx,
            session: ReloadSession::new(),
            pending: PendingReload::new(),
            debounce,
            strategy,
            launcher: None,
        }
    }

    /// Launch a browser after builds when none is attached.
    pub fn with_launcher(mut self, launcher: LaunchManager) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        crate::debug!("reload"; "actor started ({} strategy, {} ms debounce)",
            self.strategy.name(), self.debounce.as_millis());

        loop {
            let deadline = self.pending.deadline();
            tokio::select! {
                msg = self.rx.recv() => {
                    let Some(msg) = msg else { break };
                    if !self.handle(msg).await {
                        break;
                    }
                }
                () = sleep_until(deadline) => {
                    if let Some(scheduled_at) = self.pending.take_due(Instant::now()) {
                        crate::debug!("reload"; "debounce elapsed after {} ms",
                            scheduled_at.elapsed().as_millis());
                        self.strategy.reload(&self.session).await;
                    }
                }
            }
        }

        self.session.close_all();
        crate::debug!("reload"; "actor stopped");
    }

    /// Returns `false` to stop the loop.
    async fn handle(&mut self, msg: ReloadMsg) -> bool {
        match msg {
            ReloadMsg::AssetsChanged => self.schedule(),

            ReloadMsg::BuildDone { changed } => {
                if changed {
                    self.schedule();
                }
                self.maybe_launch().await;
            }

            ReloadMsg::ClientConnected { id, addr, tx } => {
                self.session.connect(id, addr, tx);
            }

            ReloadMsg::ClientDisconnected { id } => {
                self.session.disconnect(id, Instant::now());
            }

            ReloadMsg::Shutdown => {
                if self.pending.cancel() {
                    crate::debug!("reload"; "dropped pending reload");
                }
                return false;
            }
        }
        true
    }

    fn schedule(&mut self) {
        if self.pending.trigger(Instant::now(), self.debounce) {
            crate::debug!("reload"; "restarted debounce timer");
        }
    }

    async fn maybe_launch(&mut self) {
        let Some(launcher) = self.launcher.as_mut() else {
            return;
        };

        let now = Instant::now();
        let attached = self.strategy.browser_attached(&self.session, now).await;
        match launcher.maybe_launch(attached, now) {
            Ok(true) => crate::log!("launch"; "started browser with {}", launcher.start_url()),
            Ok(false) => {}
            Err(e) => crate::error!("launch"; "{}", crate::logger::error_chain(&e)),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::{ServerFrame, SocketPush};
    use tokio::sync::mpsc::error::TryRecvError;
    use tungstenite::protocol::Message;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    struct Harness {
        tx: mpsc::Sender<ReloadMsg>,
        client_rx: mpsc::UnboundedReceiver<Message>,
        handle: tokio::task::JoinHandle<()>,
    }

    async fn spawn_actor() -> Harness {
        let (tx, rx) = mpsc::channel(32);
        let actor = ReloadActor::new(
            rx,
            Box::new(SocketPush::new(Duration::from_millis(2000))),
            DEBOUNCE,
        );
        let handle = tokio::spawn(actor.run());

        let (client_tx, client_rx) = mpsc::unbounded_channel();
        tx.send(ReloadMsg::ClientConnected {
            id: 1,
            addr: "127.0.0.1:50000".parse().unwrap(),
            tx: client_tx,
        })
        .await
        .unwrap();

        Harness {
            tx,
            client_rx,
            handle,
        }
    }

    fn drain_reloads(rx: &mut mpsc::UnboundedReceiver<Message>) -> usize {
        let mut count = 0;
        loop {
            match rx.try_recv() {
                Ok(msg) if msg == ServerFrame::Reload.to_message() => count += 1,
                Ok(_) => {}
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return count,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_window_reloads_once() {
        let mut h = spawn_actor().await;

        for _ in 0..5 {
            h.tx.send(ReloadMsg::AssetsChanged).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(drain_reloads(&mut h.client_rx), 0);

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(drain_reloads(&mut h.client_rx), 1);

        h.tx.send(ReloadMsg::Shutdown).await.unwrap();
        h.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_notifications_reload_each_time() {
        let mut h = spawn_actor().await;

        for _ in 0..3 {
            h.tx.send(ReloadMsg::AssetsChanged).await.unwrap();
            tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
        }
        assert_eq!(drain_reloads(&mut h.client_rx), 3);

        h.tx.send(ReloadMsg::Shutdown).await.unwrap();
        h.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_build_does_not_reload() {
        let mut h = spawn_actor().await;

        h.tx.send(ReloadMsg::BuildDone { changed: false }).await.unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(drain_reloads(&mut h.client_rx), 0);

        h.tx.send(ReloadMsg::BuildDone { changed: true }).await.unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(drain_reloads(&mut h.client_rx), 1);

        h.tx.send(ReloadMsg::Shutdown).await.unwrap();
        h.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_and_closes_clients() {
        let mut h = spawn_actor().await;

        h.tx.send(ReloadMsg::AssetsChanged).await.unwrap();
        h.tx.send(ReloadMsg::Shutdown).await.unwrap();
        h.handle.await.unwrap();

        assert_eq!(h.client_rx.try_recv().unwrap(), Message::Close(None));
        assert_eq!(drain_reloads(&mut h.client_rx), 0);
    }
}
