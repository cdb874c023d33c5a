use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of hex characters shown when a peer is displayed by name.
pub const SHORT_ID_LEN: usize = 6;

/// Stable peer identity: lower-case hex of the peer's public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Derive the identity from the raw public key bytes the transport reports.
    pub fn from_public_key(key: &[u8]) -> Self {
        Self(hex::encode(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name. Collisions between short names are accepted.
    pub fn short(&self) -> &str {
        // hex is ASCII, so any byte offset is a char boundary
        &self.0[..self.0.len().min(SHORT_ID_LEN)]
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_hex_from_key() {
        let id = PeerId::from_public_key(&[0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67]);
        assert_eq!(id.as_str(), "abcdef01234567");
        assert_eq!(id.short(), "abcdef");
    }

    #[test]
    fn short_id_of_tiny_key() {
        let id = PeerId::from_public_key(&[0x01]);
        assert_eq!(id.short(), "01");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = PeerId::from_public_key(&[0xff; 2]);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ffff\"");
    }
}
