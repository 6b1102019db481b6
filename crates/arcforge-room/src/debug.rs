//! A point-in-time snapshot of the coordinator's internal tables, for
//! the debug/dump endpoint and for verifying the invariants by hand
//! while developing a new game kind.

use arcforge_protocol::{PlayerId, RoomId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSnapshot {
    /// Rooms currently being ticked.
    pub active_games: Vec<RoomId>,
    /// `(game_kind, room)` pairs still waiting for players, in queue order.
    pub waiting_games: Vec<(String, RoomId)>,
    /// Every room the coordinator currently knows about (active + waiting).
    pub games: Vec<RoomId>,
    /// Which room each connected player currently occupies.
    pub user_rooms: Vec<(PlayerId, RoomId)>,
    /// Room IDs still available for allocation.
    pub free_ids: u32,
    /// Total room-ID capacity.
    pub capacity: u32,
}

impl DebugSnapshot {
    /// Checks the invariants the design notes call out explicitly:
    /// active and waiting rooms are disjoint, and together they account
    /// for exactly the rooms table. Returns the first violation found,
    /// if any.
    pub fn check_invariants(&self) -> Result<(), String> {
        let active: std::collections::HashSet<_> = self.active_games.iter().collect();
        let waiting: std::collections::HashSet<_> =
            self.waiting_games.iter().map(|(_, r)| r).collect();

        if !active.is_disjoint(&waiting) {
            return Err("a room is both active and waiting".into());
        }

        let games: std::collections::HashSet<_> = self.games.iter().collect();
        let union: std::collections::HashSet<_> = active.union(&waiting).copied().collect();
        if union != games {
            return Err("active ∪ waiting does not equal the games table".into());
        }

        if self.free_ids > self.capacity {
            return Err("free id count exceeds total capacity".into());
        }

        Ok(())
    }
}
