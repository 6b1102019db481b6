//! Unified error type for the Arcforge framework.

use arcforge_protocol::ProtocolError;
use arcforge_room::CoreError;
use arcforge_session::SessionError;
use arcforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `arcforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ArcforgeError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, reconnect, expired).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A coordinator-level error (capacity, validation, consistency, a
    /// game kind's own error).
    #[error(transparent)]
    Core(#[from] CoreError),
}
