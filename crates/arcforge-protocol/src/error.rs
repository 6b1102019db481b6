//! Error types for the protocol layer — wire format problems only, not
//! session or room-level failures.

/// Errors that can occur encoding or decoding a message, or validating
/// one that decoded fine but doesn't make sense as a message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Turning a value into bytes failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Turning bytes into a value failed — malformed JSON, a missing
    /// required field, or a truncated message.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Decoded fine but violates a protocol-level rule that isn't
    /// expressible in the type alone — a handshake at protocol version
    /// 0, say, or an out-of-range error code.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
