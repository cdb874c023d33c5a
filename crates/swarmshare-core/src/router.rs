use std::sync::Arc;

use bytes::Bytes;
use swarmshare_types::{Message, PeerId, ProtocolEvent};
use tracing::trace;

use crate::codec;
use crate::error::Result;
use crate::events::EventSender;
use crate::reassembly::ReassemblyEngine;

/// Decodes inbound frames and sends each message where it belongs: chunks to
/// reassembly, chat and direct messages straight out as events.
pub struct MessageRouter {
    reassembly: Arc<ReassemblyEngine>,
    events: EventSender,
}

impl MessageRouter {
    pub fn new(reassembly: Arc<ReassemblyEngine>, events: EventSender) -> Self {
        Self { reassembly, events }
    }

    /// Handle one frame from `peer`. Errors concern this frame only; the
    /// caller logs them and keeps reading.
    pub async fn route(&self, peer: &PeerId, frame: &[u8]) -> Result<()> {
        let msg = codec::decode(frame)?;
        trace!(peer = %peer.short(), kind = msg.kind(), len = frame.len(), "frame");

        match msg {
            Message::FileChunk {
                file_name,
                payload,
                index,
                total,
            } => {
                self.reassembly
                    .on_chunk(peer, &file_name, index, total, payload)
                    .await?;
            }
            Message::Chat { message, timestamp } => {
                self.events.emit(ProtocolEvent::ChatReceived {
                    peer: peer.clone(),
                    message,
                    timestamp,
                });
            }
            Message::DirectMessage { message, timestamp } => {
                self.events.emit(ProtocolEvent::DirectMessageReceived {
                    peer: peer.clone(),
                    message,
                    timestamp,
                });
            }
        }
        Ok(())
    }

    /// Same as [`route`](Self::route), for frames already held as `Bytes`.
    pub async fn route_bytes(&self, peer: &PeerId, frame: Bytes) -> Result<()> {
        self.route(peer, &frame).await
    }
}
