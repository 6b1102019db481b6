//! The [`GameInstance`] contract: the one trait every game kind must
//! implement to be hosted by a [`crate::coordinator::Coordinator`].
//!
//! The coordinator holds many different game kinds side by side in the
//! same tables, so this trait is *object-safe* — callable through
//! `Box<dyn GameInstance>` — letting `&str` game-kind names map to
//! heterogeneous boxed instances.

use arcforge_protocol::{Action, GameStatus, PlayerId};
use serde_json::Value;

/// Errors a game kind can raise from inside its own methods.
///
/// Kept deliberately small: a game kind doesn't get to distinguish
/// capacity/validation/consistency failures the way the coordinator
/// does (those are the coordinator's job, checked before ever calling
/// into the instance) — it can only say "this enqueued action doesn't
/// make sense" or "something internal broke".
#[derive(Debug, Clone, thiserror::Error)]
pub enum GameError {
    /// A queued action failed validation once it was actually applied
    /// (distinct from [`GameInstance::is_valid_action`], which is a
    /// cheap pre-check done without mutating state).
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Anything else that went wrong while the game kind was running.
    #[error("{0}")]
    Internal(String),

    /// An instance-trait method unwound with a panic. The driver catches
    /// it at the call boundary and converts it to this so one buggy game
    /// kind can't take the coordinator or another room's tick loop down
    /// with it.
    #[error("game kind panicked: {0}")]
    Panicked(String),
}

/// A queued action plus who sent it, handed to [`GameInstance::tick`] in
/// submission order.
#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub player: PlayerId,
    pub action: Action,
}

/// The behavior every hosted game kind must provide.
///
/// # Object safety
///
/// Every method takes `&self`/`&mut self` (never `self` by value) and
/// never returns `Self` or takes a generic parameter, so this trait can
/// be used as `Box<dyn GameInstance>`. The coordinator's `Games` table
/// is `HashMap<RoomId, GameCell>` where `GameCell` wraps one of these
/// boxes behind the per-instance lock described in the room driver.
///
/// # Lifecycle
///
/// ```text
/// new → add_player*/add_spectator* → [is_ready] → activate → tick* → …
///                                                      ↑         |
///                                                      +---RESET-+
///                                                                |
///                                                              DONE
/// ```
///
/// `tick` is called at most once per instance at a time (the driver
/// holds the instance's lock for the duration of the call), and never
/// concurrently with `add_player`/`remove_player`/`enqueue_action` —
/// those also take the same lock. Methods other than `tick` may be
/// called at any point in the lifecycle; they must tolerate being
/// invoked before `activate` and after the game is finished.
pub trait GameInstance: Send {
    /// No more player slots available; further `add_player` calls
    /// should fail validation upstream before they're even attempted.
    fn is_full(&self) -> bool;

    /// Enough players (and spectators, if relevant) are present to
    /// `activate`. Checked by the coordinator after every `join`.
    fn is_ready(&self) -> bool;

    /// No players or spectators remain. The coordinator reclaims an
    /// empty, inactive instance's room ID immediately.
    fn is_empty(&self) -> bool;

    /// The instance is currently being ticked by the driver.
    fn is_active(&self) -> bool;

    /// Transition from not-active to active. Called once `is_ready()`
    /// is true (or again after a `RESET` tick result, per `needs_reset`).
    fn activate(&mut self);

    /// Transition from active to not-active without discarding state —
    /// used when a sub-game ends but the series continues.
    fn deactivate(&mut self);

    /// The whole series is over; the driver will call `tick` one final
    /// time then drop the instance. Distinct from `curr_game_over`,
    /// which only ends the *current* sub-game.
    fn is_finished(&self) -> bool;

    /// The current sub-game (not necessarily the whole series) has
    /// concluded. Used by multi-game series (best-of-N) to decide
    /// whether to `reset` into another sub-game or call it finished.
    fn curr_game_over(&self) -> bool;

    /// Whether the instance wants a `reset()` call before the next
    /// `activate()` — distinguishes "sub-game ended, more to play"
    /// from "everything is done".
    fn needs_reset(&self) -> bool;

    /// Clear sub-game state (board, scores-in-progress) while keeping
    /// the player roster, ready for the next sub-game in the series.
    fn reset(&mut self);

    /// Seat a new player. Returns `Err` if the instance is full or the
    /// player is already seated; the coordinator treats this as a
    /// validation failure.
    fn add_player(&mut self, player: PlayerId) -> Result<(), GameError>;

    /// Attach a spectator — present in the broadcast list but never a
    /// turn participant.
    fn add_spectator(&mut self, player: PlayerId);

    /// Remove a seated player, e.g. on disconnect or explicit leave.
    fn remove_player(&mut self, player: PlayerId);

    /// Remove a spectator.
    fn remove_spectator(&mut self, player: PlayerId);

    /// Queue an action for the next `tick`. Never blocks and never
    /// mutates game state directly — actions are buffered and drained
    /// inside `tick` so every mutation happens under one lock
    /// acquisition, not one per inbound packet.
    fn enqueue_action(&mut self, action: QueuedAction);

    /// Cheap structural pre-check (not a full rules check) used by the
    /// coordinator to reject obviously-malformed actions before they're
    /// even queued — e.g. a player acting who isn't seated.
    fn is_valid_action(&self, player: PlayerId, action: &Action) -> bool;

    /// Advance the simulation by one tick, draining any queued actions.
    ///
    /// Returns the instance's status after the tick: [`GameStatus::Active`]
    /// to keep ticking, [`GameStatus::Reset`] when the current sub-game
    /// ended but the series continues, [`GameStatus::Done`] when the
    /// whole series is over, [`GameStatus::Inactive`] if called while not
    /// active (a driver bug, but must not panic).
    ///
    /// # Errors
    /// A tick may fail with [`GameError`] — the driver reports this to
    /// the room as `game_error` and tears the instance down rather than
    /// calling `tick` again.
    fn tick(&mut self) -> Result<GameStatus, GameError>;

    /// Per-player state payload, sent as `state_pong`. Most instances
    /// return the same value for every player; games with hidden
    /// information (a spectator's fog of war, a hidden hand) can vary
    /// it by `recipient`.
    fn get_state(&self, recipient: PlayerId) -> Value;

    /// Convenience default: the JSON most clients want — identical to
    /// `get_state` unless a game kind overrides it for a specific
    /// outbound message.
    fn to_json(&self, recipient: PlayerId) -> Value {
        self.get_state(recipient)
    }

    /// Auxiliary metadata sent alongside `reset_game`/`end_game` — final
    /// scores, a winner id, anything beyond the raw state snapshot.
    fn get_data(&self) -> Value {
        Value::Null
    }

    /// Every player and spectator currently seated, for broadcast
    /// fan-out. Order is not significant.
    fn participants(&self) -> Vec<PlayerId>;

    /// Ticks per second this instance wants to run at. The driver clamps
    /// this to the server's configured maximum.
    fn fps(&self) -> u32 {
        10
    }
}
