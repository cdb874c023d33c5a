//! Framing codec: one JSON object per transport frame.
//!
//! The transport already delimits frames, so the codec only maps a `Message`
//! to bytes and back. Decoding never panics; anything that is not a valid
//! message of a known `kind` becomes `DecodeError::Malformed`.

use bytes::Bytes;
use swarmshare_types::Message;

use crate::error::{DecodeError, Error};

pub fn encode(msg: &Message) -> Result<Bytes, Error> {
    Ok(Bytes::from(serde_json::to_vec(msg)?))
}

pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Build and encode a chunk frame.
pub fn encode_chunk(file_name: &str, index: u32, total: u32, payload: Bytes) -> Result<Bytes, Error> {
    encode(&Message::FileChunk {
        file_name: file_name.to_owned(),
        payload,
        index: i64::from(index),
        total: i64::from(total),
    })
}
