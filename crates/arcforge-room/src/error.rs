//! Error types for the room layer.

use arcforge_protocol::{PlayerId, RoomId};

/// Errors surfaced by the [`crate::coordinator::Coordinator`] in response
/// to a client-originated event (`create`, `join`, `leave`, `action`).
///
/// These map onto the three client-visible failure modes: capacity,
/// validation, and consistency. A fourth kind, [`CoreError::Game`], wraps
/// whatever the active game kind itself raised while ticking or handling
/// an action.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The server has no room for another active game, or this caller's
    /// player slot is otherwise exhausted.
    #[error("at capacity: {0}")]
    Capacity(String),

    /// The request was well-formed but semantically invalid — an unknown
    /// game kind, a malformed action, a move outside the game's rules.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The request conflicts with bookkeeping that must hold: joining a
    /// room you're already in, leaving one you're not in, acting in a
    /// game you haven't joined.
    #[error("inconsistent state: {0}")]
    Consistency(String),

    /// The active game instance raised an error of its own (a panic, or
    /// a rule violation reported as an `Err`) while ticking or applying
    /// an action.
    #[error("game error: {0}")]
    Game(String),

    /// Named room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// Named player is not currently in a room.
    #[error("player {0} has no room")]
    PlayerNotInRoom(PlayerId),
}

impl CoreError {
    /// `true` for errors that should surface to the client as
    /// `creation_failed` rather than a generic `server_error`.
    pub fn is_capacity(&self) -> bool {
        matches!(self, CoreError::Capacity(_))
    }
}
