use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Every frame exchanged between peers. One JSON object per transport write,
/// discriminated by `kind`.
///
/// ```text
/// { "kind": "chunk", "fileName": "a.bin", "chunk": "<base64>", "index": 0, "total": 3 }
/// { "kind": "chat",  "message": "hi", "timestamp": 1700000000000 }
/// { "kind": "dm",    "message": "hi", "timestamp": 1700000000000 }
/// ```
///
/// `index` and `total` stay signed on the wire so that out-of-range values
/// from a misbehaving sender decode cleanly and are rejected by reassembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Message {
    #[serde(rename = "chunk", rename_all = "camelCase")]
    FileChunk {
        file_name: String,
        #[serde(rename = "chunk", with = "base64_bytes")]
        payload: Bytes,
        index: i64,
        total: i64,
    },

    #[serde(rename = "chat")]
    Chat { message: String, timestamp: i64 },

    #[serde(rename = "dm")]
    DirectMessage { message: String, timestamp: i64 },
}

impl Message {
    /// Wire discriminant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileChunk { .. } => "chunk",
            Self::Chat { .. } => "chat",
            Self::DirectMessage { .. } => "dm",
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&B64.encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(d)?;
        B64.decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_uses_wire_field_names() {
        let msg = Message::FileChunk {
            file_name: "notes.txt".into(),
            payload: Bytes::from_static(b"hi"),
            index: 0,
            total: 1,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "chunk");
        assert_eq!(json["fileName"], "notes.txt");
        assert_eq!(json["chunk"], "aGk=");
        assert_eq!(json["index"], 0);
        assert_eq!(json["total"], 1);
    }

    #[test]
    fn dm_and_chat_tags() {
        let chat = Message::Chat {
            message: "hello".into(),
            timestamp: 42,
        };
        let dm = Message::DirectMessage {
            message: "psst".into(),
            timestamp: 43,
        };
        assert_eq!(serde_json::to_value(&chat).unwrap()["kind"], "chat");
        assert_eq!(serde_json::to_value(&dm).unwrap()["kind"], "dm");
        assert_eq!(dm.kind(), "dm");
    }

    #[test]
    fn parses_fields_in_any_order() {
        let raw = r#"{"total":2,"chunk":"AAE=","index":1,"fileName":"x","kind":"chunk"}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            Message::FileChunk {
                file_name: "x".into(),
                payload: Bytes::from_static(&[0, 1]),
                index: 1,
                total: 2,
            }
        );
    }

    #[test]
    fn rejects_invalid_base64() {
        let raw = r#"{"kind":"chunk","fileName":"x","chunk":"***","index":0,"total":1}"#;
        assert!(serde_json::from_str::<Message>(raw).is_err());
    }
}
