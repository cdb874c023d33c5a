use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::reassembly::ReassemblyEngine;

/// Background task that abandons stalled transfers.
///
/// Every `interval`, drops any transfer that has not received a chunk for
/// `max_idle`. Each one emits `TransferAbandoned`.
pub async fn run_expiry_loop(engine: Arc<ReassemblyEngine>, max_idle: Duration, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let count = engine.expire_idle(max_idle);
        if count > 0 {
            info!("Cleanup: abandoned {} idle transfers", count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSender;
    use crate::storage::DiskStorage;
    use bytes::Bytes;
    use swarmshare_types::{PeerId, ProtocolEvent};

    #[tokio::test]
    async fn loop_expires_stalled_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let (events, mut rx) = EventSender::channel();
        let engine = Arc::new(ReassemblyEngine::new(
            Arc::new(DiskStorage::new(dir.path().to_path_buf())),
            events,
        ));
        let peer = PeerId::from_public_key(&[7; 32]);
        engine
            .on_chunk(&peer, "half.bin", 0, 2, Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(ProtocolEvent::ChunkReceived { .. })));

        let task = tokio::spawn(run_expiry_loop(engine.clone(), Duration::ZERO, Duration::from_millis(10)));
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ProtocolEvent::TransferAbandoned { received: 1, total: 2, .. }));
        assert_eq!(engine.in_flight(), 0);
        task.abort();
    }
}
