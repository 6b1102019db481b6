//! Turn-based play support, composed into a [`GameInstance`](crate::instance::GameInstance)
//! the same way [`crate::npc::NpcSupport`] is.
//!
//! Each seated player gets a `tokio::sync::Semaphore` starting at zero
//! permits — a "turn token". Giving a player their turn means adding one
//! permit; `is_players_turn` is a non-blocking `try_acquire` so checking
//! (and consuming) a turn never stalls the tick loop. This is the same
//! trick a connection-pool semaphore uses to gate concurrent access,
//! just with exactly one permit in flight across the whole set at a
//! time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arcforge_protocol::{Action, PlayerId};
use tokio::sync::Semaphore;

/// Turn-order bookkeeping and a timeout watchdog for one game instance.
pub struct TurnSupport {
    order: Vec<PlayerId>,
    tokens: HashMap<PlayerId, Arc<Semaphore>>,
    current: usize,
    /// Which sub-game in a best-of-N series this is. Incremented by the
    /// game kind on `reset`, not by `TurnSupport` itself.
    curr_game_number: u32,
    turn_timeout: Duration,
    turn_started_at: Instant,
}

impl TurnSupport {
    /// Builds turn order from `players`, handing the first player their
    /// token immediately.
    pub fn new(players: &[PlayerId], turn_timeout: Duration) -> Self {
        let mut tokens = HashMap::new();
        for &p in players {
            tokens.insert(p, Arc::new(Semaphore::new(0)));
        }
        if let Some(&first) = players.first() {
            tokens[&first].add_permits(1);
        }
        Self {
            order: players.to_vec(),
            tokens,
            current: 0,
            curr_game_number: 0,
            turn_timeout,
            turn_started_at: Instant::now(),
        }
    }

    pub fn curr_game_number(&self) -> u32 {
        self.curr_game_number
    }

    /// Whose turn it currently is.
    pub fn current_player(&self) -> Option<PlayerId> {
        self.order.get(self.current).copied()
    }

    /// Non-blocking check: does `player` hold the turn token right now?
    /// On success the token is consumed — the caller must have already
    /// validated and is about to apply the move.
    pub fn try_take_turn(&self, player: PlayerId) -> bool {
        match self.tokens.get(&player) {
            Some(sem) => sem.try_acquire().is_ok(),
            None => false,
        }
    }

    /// Moves the turn token to the next player in round-robin order and
    /// resets the timeout clock. Call after a valid move is applied, or
    /// after the watchdog forces a default action.
    pub fn advance_turn(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.current = (self.current + 1) % self.order.len();
        if let Some(next) = self.current_player() {
            self.tokens[&next].add_permits(1);
        }
        self.turn_started_at = Instant::now();
    }

    /// Starts a new sub-game: resets to the first player in `order` and
    /// bumps the series counter.
    pub fn start_new_game(&mut self) {
        self.curr_game_number += 1;
        self.current = 0;
        for sem in self.tokens.values() {
            // Drain any stale permits from the previous sub-game.
            while sem.try_acquire().is_ok() {}
        }
        if let Some(&first) = self.order.first() {
            self.tokens[&first].add_permits(1);
        }
        self.turn_started_at = Instant::now();
    }

    /// `true` once the current player has held the token longer than
    /// `turn_timeout` without acting.
    pub fn is_timed_out(&self) -> bool {
        self.turn_started_at.elapsed() >= self.turn_timeout
    }

    /// Produces a default action for the timed-out player and advances
    /// the turn, mirroring the watchdog behavior: a silent player
    /// doesn't stall the game for everyone else.
    pub fn force_default_action(&mut self, default: impl FnOnce(PlayerId) -> Action) -> Option<(PlayerId, Action)> {
        let player = self.current_player()?;
        // Consume the token ourselves since the player never did.
        let _ = self.tokens[&player].try_acquire();
        let action = default(player);
        self.advance_turn();
        Some((player, action))
    }
}
