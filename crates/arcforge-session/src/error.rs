//! Error types for the session layer.

/// Errors that can occur during session management: authentication,
/// creation, reconnection, and expiration.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the token —
    /// invalid, expired, or otherwise not a real player.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for this player — they disconnected (and fully
    /// expired) or were never connected in the first place.
    #[error("session not found for player {0}")]
    NotFound(arcforge_protocol::PlayerId),

    /// The reconnection token presented doesn't match anything the
    /// server issued. Stale token, typo, or a guess.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The reconnection grace period elapsed before this player came
    /// back; their old session is gone for good.
    #[error("session expired for player {0}")]
    SessionExpired(arcforge_protocol::PlayerId),

    /// This player already has a `Connected` session — one session per
    /// player at a time.
    #[error("player {0} already has an active session")]
    AlreadyConnected(arcforge_protocol::PlayerId),
}
