//! Outbound fan-out, abstracted away from any particular transport.
//!
//! The coordinator and the tick driver need to push
//! [`SessionEvent`](arcforge_protocol::SessionEvent)s to specific players
//! without knowing whether those players are reachable over a WebSocket,
//! an in-process channel (as in the integration tests), or nothing at
//! all (a bot that never actually needed a socket). The top-level
//! `arcforge` crate implements this trait over its live connection table;
//! `arcforge-room`'s tests implement it over a `Vec`-backed recorder.

use arcforge_protocol::{PlayerId, SessionEvent};

/// Delivers a session event to one player.
///
/// Implementations must not block — queue and return. A player who has
/// disconnected (or was never connected, e.g. an NPC) is simply a no-op
/// send, not an error; the coordinator doesn't care whether anyone was
/// listening.
pub trait Broadcaster: Send + Sync {
    fn send(&self, player: PlayerId, event: SessionEvent);

    /// Convenience: send the same event to every player in `recipients`.
    fn broadcast(&self, recipients: &[PlayerId], event: SessionEvent) {
        for &player in recipients {
            self.send(player, event.clone());
        }
    }
}
