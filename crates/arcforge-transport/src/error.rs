//! Error type for the transport layer.

/// Errors a [`Transport`](crate::Transport) or
/// [`Connection`](crate::Connection) implementation can surface.
///
/// The session handler treats any variant here the same way: the
/// connection is dead, so it runs disconnect cleanup and, if the player
/// was mid-game, leaves the room's seat vacated rather than stuck.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection, or we closed it ourselves.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting an incoming socket failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The transport itself was shut down (server stopping), not any
    /// one connection.
    #[error("transport shut down")]
    Shutdown,
}
