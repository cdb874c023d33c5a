use std::io;
use std::path::PathBuf;

use swarmshare_types::PeerId;

/// A frame that could not be turned into a `Message`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Failure handing a frame to one peer's connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("peer {0} is not connected")]
    NotConnected(PeerId),
    #[error("connection to peer {0} is closed")]
    Closed(PeerId),
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("protocol violation from {} on \"{file_name}\": {reason}", peer.short())]
    ProtocolViolation {
        peer: PeerId,
        file_name: String,
        reason: String,
    },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("refusing to send empty file: {}", .0.display())]
    EmptyFile(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no connected peer matches \"{0}\"")]
    PeerNotFound(String),

    #[error("failed to save \"{file_name}\" from {}: {source}", peer.short())]
    IoFailure {
        peer: PeerId,
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("send to {} failed: {source}", peer.short())]
    PeerWriteFailure {
        peer: PeerId,
        #[source]
        source: TransportError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
