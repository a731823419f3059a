//! Codec trait and implementations for serializing messages.
//!
//! The rest of the stack doesn't care how envelopes become bytes — it
//! talks to the [`Codec`] trait. [`JsonCodec`] is the default: readable in
//! DevTools, easy to debug. A binary codec can slot in later without
//! touching any other layer.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust types to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, Payload, SystemMessage};

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let envelope = Envelope {
            seq: 1,
            timestamp: 5000,
            payload: Payload::System(SystemMessage::Heartbeat { client_time: 5000 }),
        };
        let bytes = codec.encode(&envelope).unwrap();
        let decoded: Envelope = codec.decode(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_json_codec_decode_rejects_truncated_input() {
        let codec = JsonCodec;
        let result: Result<Envelope, _> = codec.decode(b"{\"seq\": 1");
        assert!(result.is_err());
    }
}
