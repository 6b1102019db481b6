//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The protocol layer doesn't care how an [`Envelope`](crate::Envelope)
//! gets turned into bytes — it only needs something implementing
//! [`Codec`]. [`JsonCodec`] is the one arcforge ships; a binary codec
//! (bincode, msgpack) can be added later as another implementation
//! without touching anything that calls through the trait.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back, for any value
/// that implements the right serde trait.
///
/// `Send + Sync + 'static`: the connection handler task may hand the
/// codec to any worker, and it has to outlive any single connection.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// [`ProtocolError::Encode`] if the value can't be represented in
    /// this format.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// [`ProtocolError::Decode`] if `data` is malformed, truncated, or
    /// doesn't match `T`'s shape.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json` — human-readable on the wire,
/// easy to inspect in logs or a browser's network tab. Behind the
/// `json` feature, enabled by default.
///
/// ```rust
/// use arcforge_protocol::{JsonCodec, Codec, Envelope, Payload, SystemMessage, Channel};
///
/// let codec = JsonCodec;
///
/// let envelope = Envelope {
///     seq: 1,
///     timestamp: 5000,
///     channel: Channel::ReliableOrdered,
///     payload: Payload::System(SystemMessage::Heartbeat { client_time: 5000 }),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
