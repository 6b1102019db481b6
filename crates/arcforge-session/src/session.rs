//! Session types: the record of a single connected player.

use std::time::Instant;

use arcforge_protocol::PlayerId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior, set once at server startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected player has to reconnect before their
    /// session is permanently expired. `0` disables reconnection.
    ///
    /// Default: 30 seconds.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle of a player's session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapses)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Actively connected — can send and receive.
    Connected,

    /// Disconnected at `since`; has until `since + grace_period` to
    /// reconnect before the session moves to `Expired`.
    Disconnected { since: Instant },

    /// Grace period elapsed. Dead; pending cleanup. The player must
    /// authenticate again to get a new session.
    Expired,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single player's session on the server.
///
/// Created on successful authentication; lives until the player
/// disconnects and the grace period expires, or the server shuts down.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// Current lifecycle state.
    pub state: SessionState,

    /// A 32-character hex secret (128 bits) the client can present to
    /// resume this session after a disconnect, instead of
    /// re-authenticating — a brief network drop shouldn't eject a player
    /// from the room they're in.
    pub reconnect_token: String,
}
