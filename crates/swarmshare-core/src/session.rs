use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use swarmshare_types::PeerId;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::directory::PeerDirectory;
use crate::error::Error;
use crate::router::MessageRouter;
use crate::transport::PeerEvent;

/// Consumes transport events and runs one inbound worker per connected peer.
///
/// Each worker routes its peer's frames strictly in arrival order. Workers
/// run concurrently, so a slow commit for one peer never holds up another.
pub struct Session {
    directory: PeerDirectory,
    router: Arc<MessageRouter>,
    workers: HashMap<PeerId, mpsc::UnboundedSender<Bytes>>,
}

impl Session {
    pub fn new(directory: PeerDirectory, router: Arc<MessageRouter>) -> Self {
        Self {
            directory,
            router,
            workers: HashMap::new(),
        }
    }

    /// Run until the transport side of `events` is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<PeerEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        debug!("transport event stream closed");
    }

    pub async fn handle(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Connected(peer) => {
                if !self.directory.on_peer_connected(peer.clone()).await {
                    return;
                }
                let tx = spawn_worker(peer.clone(), self.router.clone());
                self.workers.insert(peer, tx);
            }
            PeerEvent::Data(peer, frame) => match self.workers.get(&peer) {
                Some(tx) => {
                    let _ = tx.send(frame);
                }
                None => warn!(peer = %peer.short(), "frame from unregistered peer dropped"),
            },
            PeerEvent::Disconnected(peer) => {
                // Dropping the sender lets the worker drain what is queued, then exit.
                self.workers.remove(&peer);
                self.directory.on_peer_disconnected(&peer).await;
            }
        }
    }

    pub fn active_workers(&self) -> usize {
        self.workers.len()
    }
}

fn spawn_worker(peer: PeerId, router: Arc<MessageRouter>) -> mpsc::UnboundedSender<Bytes> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = router.route_bytes(&peer, frame).await {
                report(&peer, &e);
            }
        }
        debug!(peer = %peer.short(), "inbound worker finished");
    });
    tx
}

fn report(peer: &PeerId, e: &Error) {
    match e {
        Error::Decode(_) => warn!(peer = %peer.short(), "discarding frame: {e}"),
        Error::ProtocolViolation { .. } => warn!(peer = %peer.short(), "discarding chunk: {e}"),
        _ => error!(peer = %peer.short(), "{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::events::EventSender;
    use crate::reassembly::ReassemblyEngine;
    use crate::storage::DiskStorage;
    use swarmshare_types::ProtocolEvent;

    fn peer(n: u8) -> PeerId {
        PeerId::from_public_key(&[n; 32])
    }

    fn session(dir: &std::path::Path) -> (Session, mpsc::UnboundedReceiver<ProtocolEvent>) {
        let (events, rx) = EventSender::channel();
        let engine = Arc::new(ReassemblyEngine::new(
            Arc::new(DiskStorage::new(dir.to_path_buf())),
            events.clone(),
        ));
        let router = Arc::new(MessageRouter::new(engine, events.clone()));
        (Session::new(PeerDirectory::new(events), router), rx)
    }

    async fn next_matching(
        rx: &mut mpsc::UnboundedReceiver<ProtocolEvent>,
        pred: impl Fn(&ProtocolEvent) -> bool,
    ) -> ProtocolEvent {
        loop {
            let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn malformed_frame_does_not_stop_peer() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(dir.path());
        let p = peer(1);

        session.handle(PeerEvent::Connected(p.clone())).await;
        session
            .handle(PeerEvent::Data(p.clone(), Bytes::from_static(b"garbage")))
            .await;
        let chat = codec::encode(&swarmshare_types::Message::Chat {
            message: "still here".into(),
            timestamp: 1,
        })
        .unwrap();
        session.handle(PeerEvent::Data(p.clone(), chat)).await;

        let event = next_matching(&mut rx, |e| matches!(e, ProtocolEvent::ChatReceived { .. })).await;
        assert!(matches!(event, ProtocolEvent::ChatReceived { message, .. } if message == "still here"));
    }

    #[tokio::test]
    async fn disconnect_drains_then_leaves() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(dir.path());
        let p = peer(2);

        session.handle(PeerEvent::Connected(p.clone())).await;
        assert_eq!(session.active_workers(), 1);
        let frame = codec::encode_chunk("last.txt", 0, 1, Bytes::from_static(b"bye")).unwrap();
        session.handle(PeerEvent::Data(p.clone(), frame)).await;
        session.handle(PeerEvent::Disconnected(p.clone())).await;
        assert_eq!(session.active_workers(), 0);

        let (mut left, mut complete) = (false, false);
        while !(left && complete) {
            match next_matching(&mut rx, |_| true).await {
                ProtocolEvent::PeerLeft { .. } => left = true,
                ProtocolEvent::TransferComplete { .. } => complete = true,
                _ => {}
            }
        }
        assert_eq!(std::fs::read(dir.path().join("received_last.txt")).unwrap(), b"bye");
    }

    #[tokio::test]
    async fn run_stops_when_transport_closes() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut rx) = session(dir.path());
        let (tx, events) = mpsc::channel(8);
        let task = tokio::spawn(session.run(events));

        tx.send(PeerEvent::Connected(peer(3))).await.unwrap();
        drop(tx);
        task.await.unwrap();
        assert_eq!(rx.recv().await, Some(ProtocolEvent::PeerJoined { peer: peer(3) }));
    }

    #[tokio::test]
    async fn data_from_unknown_peer_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut rx) = session(dir.path());
        session
            .handle(PeerEvent::Data(peer(4), Bytes::from_static(b"{}")))
            .await;
        assert!(rx.try_recv().is_err());
    }
}
