use std::fmt;
use std::path::PathBuf;

use crate::peer::PeerId;

/// Events the core reports upward as it processes connections and frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// A connection to a new peer was established
    PeerJoined { peer: PeerId },

    /// A peer's connection went away
    PeerLeft { peer: PeerId },

    /// A broadcast chat line arrived
    ChatReceived {
        peer: PeerId,
        message: String,
        timestamp: i64,
    },

    /// A message addressed only to us arrived
    DirectMessageReceived {
        peer: PeerId,
        message: String,
        timestamp: i64,
    },

    /// A previously unseen chunk index was buffered
    ChunkReceived {
        peer: PeerId,
        file_name: String,
        index: u32,
        total: u32,
    },

    /// All chunks arrived and the file was written
    TransferComplete {
        peer: PeerId,
        file_name: String,
        save_path: PathBuf,
    },

    /// All chunks arrived but writing the file failed
    TransferFailed {
        peer: PeerId,
        file_name: String,
        reason: String,
    },

    /// A transfer sat idle past its deadline and was dropped
    TransferAbandoned {
        peer: PeerId,
        file_name: String,
        received: u32,
        total: u32,
    },
}

impl ProtocolEvent {
    /// The peer this event concerns. Every event is peer-scoped.
    pub fn peer(&self) -> &PeerId {
        match self {
            Self::PeerJoined { peer }
            | Self::PeerLeft { peer }
            | Self::ChatReceived { peer, .. }
            | Self::DirectMessageReceived { peer, .. }
            | Self::ChunkReceived { peer, .. }
            | Self::TransferComplete { peer, .. }
            | Self::TransferFailed { peer, .. }
            | Self::TransferAbandoned { peer, .. } => peer,
        }
    }

    /// Failure events, rendered as errors by consumers.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::TransferFailed { .. } | Self::TransferAbandoned { .. }
        )
    }
}

fn clock(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".into())
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerJoined { peer } => write!(f, "New peer joined: {}", peer.short()),
            Self::PeerLeft { peer } => write!(f, "Peer left: {}", peer.short()),
            Self::ChatReceived {
                peer,
                message,
                timestamp,
            } => write!(f, "{} <{}> {}", clock(*timestamp), peer.short(), message),
            Self::DirectMessageReceived {
                peer,
                message,
                timestamp,
            } => write!(f, "{} [dm from {}] {}", clock(*timestamp), peer.short(), message),
            Self::ChunkReceived {
                peer,
                file_name,
                index,
                total,
            } => write!(
                f,
                "Received chunk {}/{} of file \"{}\" from {}",
                index + 1,
                total,
                file_name,
                peer.short()
            ),
            Self::TransferComplete {
                peer,
                file_name,
                save_path,
            } => write!(
                f,
                "File \"{}\" received completely from {}. Saved as \"{}\"",
                file_name,
                peer.short(),
                save_path.display()
            ),
            Self::TransferFailed {
                peer,
                file_name,
                reason,
            } => write!(
                f,
                "File \"{}\" from {} could not be saved: {}",
                file_name,
                peer.short(),
                reason
            ),
            Self::TransferAbandoned {
                peer,
                file_name,
                received,
                total,
            } => write!(
                f,
                "Transfer of \"{}\" from {} abandoned after {}/{} chunks",
                file_name,
                peer.short(),
                received,
                total
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerId {
        PeerId::from_public_key(&[0x12, 0x34, 0x56, 0x78])
    }

    #[test]
    fn chunk_progress_is_one_based() {
        let event = ProtocolEvent::ChunkReceived {
            peer: peer(),
            file_name: "a.bin".into(),
            index: 0,
            total: 3,
        };
        assert_eq!(
            event.to_string(),
            "Received chunk 1/3 of file \"a.bin\" from 123456"
        );
    }

    #[test]
    fn chat_renders_clock_and_short_name() {
        let event = ProtocolEvent::ChatReceived {
            peer: peer(),
            message: "hello".into(),
            timestamp: 0,
        };
        assert_eq!(event.to_string(), "00:00:00 <123456> hello");
    }

    #[test]
    fn failure_classification() {
        let ok = ProtocolEvent::PeerLeft { peer: peer() };
        let failed = ProtocolEvent::TransferFailed {
            peer: peer(),
            file_name: "a".into(),
            reason: "disk full".into(),
        };
        assert!(!ok.is_failure());
        assert!(failed.is_failure());
        assert_eq!(failed.peer(), &peer());
    }
}
