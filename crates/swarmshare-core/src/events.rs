use swarmshare_types::ProtocolEvent;
use tokio::sync::mpsc;

/// Emits protocol events: logs each one through `tracing`, then hands it to
/// the consumer (console, tests). A dropped receiver is not an error.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ProtocolEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProtocolEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: ProtocolEvent) {
        log_event(&event);
        let _ = self.tx.send(event);
    }
}

/// Log an event at a level matching its weight: failures warn, per-chunk
/// progress is debug, everything else is info.
pub fn log_event(event: &ProtocolEvent) {
    let peer = event.peer().short();
    match event {
        ProtocolEvent::TransferFailed { .. } | ProtocolEvent::TransferAbandoned { .. } => {
            tracing::warn!(peer = %peer, "{}", event);
        }
        ProtocolEvent::ChunkReceived { .. } => {
            tracing::debug!(peer = %peer, "{}", event);
        }
        _ => {
            tracing::info!(peer = %peer, "{}", event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmshare_types::PeerId;

    #[tokio::test]
    async fn emitted_events_reach_receiver() {
        let (events, mut rx) = EventSender::channel();
        let peer = PeerId::from_public_key(&[1; 32]);
        events.emit(ProtocolEvent::PeerJoined { peer: peer.clone() });
        assert_eq!(rx.recv().await, Some(ProtocolEvent::PeerJoined { peer }));
    }

    #[test]
    fn emit_without_receiver_is_silent() {
        let (events, rx) = EventSender::channel();
        drop(rx);
        events.emit(ProtocolEvent::PeerLeft {
            peer: PeerId::from_public_key(&[2; 32]),
        });
    }
}
