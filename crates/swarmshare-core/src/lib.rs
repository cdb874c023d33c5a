//! swarmshare core: file transfer and messaging over established peer
//! connections.
//!
//! - Inbound: transport `PeerEvent`s -> `Session` (one task per peer) ->
//!   `MessageRouter` -> `ReassemblyEngine` or chat/dm events
//! - Outbound: `Orchestrator` -> `FileChunker` -> codec -> `PeerTransport`
//! - Chunks are buffered by index and only written once every index arrived

pub mod chunker;
pub mod cleanup;
pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod node;
pub mod orchestrator;
pub mod reassembly;
pub mod router;
pub mod session;
pub mod storage;
pub mod transport;

pub use config::CoreConfig;
pub use directory::{PeerDirectory, PeerEntry};
pub use error::{DecodeError, Error, Result, TransportError};
pub use events::EventSender;
pub use node::SwarmCore;
pub use orchestrator::{Orchestrator, PeerSelector, SendReport};
pub use reassembly::{ChunkOutcome, ReassemblyEngine};
pub use router::MessageRouter;
pub use session::Session;
pub use storage::{DiskStorage, FileSink};
pub use transport::{PeerEvent, PeerTransport};

pub use swarmshare_types::{Message, PeerId, ProtocolEvent};
