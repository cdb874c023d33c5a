use bytes::Bytes;
use futures_util::future::BoxFuture;
use swarmshare_types::PeerId;

use crate::error::TransportError;

/// What a transport reports upward. Connections are already established and
/// authenticated; frames are already delimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Connected(PeerId),
    Disconnected(PeerId),
    Data(PeerId, Bytes),
}

/// Outbound half of a transport: deliver one whole frame to one peer.
///
/// Frames sent to the same peer must arrive in the order `send` was called.
/// An error affects only that peer.
pub trait PeerTransport: Send + Sync {
    fn send<'a>(&'a self, peer: &'a PeerId, frame: Bytes) -> BoxFuture<'a, Result<(), TransportError>>;
}
