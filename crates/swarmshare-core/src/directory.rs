use std::sync::Arc;

use chrono::{DateTime, Utc};
use swarmshare_types::{PeerId, ProtocolEvent};
use tokio::sync::RwLock;

use crate::events::EventSender;

/// A live connection as seen by the rest of the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub id: PeerId,
    /// Short display name derived from the id.
    pub name: String,
    pub connected_at: DateTime<Utc>,
}

/// Tracks currently connected peers, in connection order.
#[derive(Clone)]
pub struct PeerDirectory {
    inner: Arc<DirectoryInner>,
}

struct DirectoryInner {
    peers: RwLock<Vec<PeerEntry>>,
    events: EventSender,
}

impl PeerDirectory {
    pub fn new(events: EventSender) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                peers: RwLock::new(Vec::new()),
                events,
            }),
        }
    }

    /// Register a connection. Returns false (and emits nothing) if the peer
    /// was already present.
    pub async fn on_peer_connected(&self, id: PeerId) -> bool {
        {
            let mut peers = self.inner.peers.write().await;
            if peers.iter().any(|p| p.id == id) {
                return false;
            }
            peers.push(PeerEntry {
                name: id.short().to_owned(),
                id: id.clone(),
                connected_at: Utc::now(),
            });
        }
        self.inner.events.emit(ProtocolEvent::PeerJoined { peer: id });
        true
    }

    /// Remove a connection. Returns false if the peer was not present.
    pub async fn on_peer_disconnected(&self, id: &PeerId) -> bool {
        {
            let mut peers = self.inner.peers.write().await;
            let Some(pos) = peers.iter().position(|p| &p.id == id) else {
                return false;
            };
            peers.remove(pos);
        }
        self.inner.events.emit(ProtocolEvent::PeerLeft { peer: id.clone() });
        true
    }

    pub async fn list(&self) -> Vec<PeerEntry> {
        self.inner.peers.read().await.clone()
    }

    /// Snapshot of connected ids, the target set for a broadcast.
    pub async fn ids(&self) -> Vec<PeerId> {
        self.inner.peers.read().await.iter().map(|p| p.id.clone()).collect()
    }

    /// Find a peer by full id, or else by short name. An ambiguous short name
    /// resolves to nothing.
    pub async fn resolve(&self, name: &str) -> Option<PeerId> {
        let peers = self.inner.peers.read().await;
        if let Some(p) = peers.iter().find(|p| p.id.as_str() == name) {
            return Some(p.id.clone());
        }
        let mut matches = peers.iter().filter(|p| p.name == name);
        match (matches.next(), matches.next()) {
            (Some(p), None) => Some(p.id.clone()),
            _ => None,
        }
    }

    pub async fn contains(&self, id: &PeerId) -> bool {
        self.inner.peers.read().await.iter().any(|p| &p.id == id)
    }

    pub async fn len(&self) -> usize {
        self.inner.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
