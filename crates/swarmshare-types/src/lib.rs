//! Shared types for the swarmshare protocol: peer identities, wire messages,
//! and the events the core reports to whoever drives it.

pub mod events;
pub mod message;
pub mod peer;

pub use events::ProtocolEvent;
pub use message::Message;
pub use peer::PeerId;
