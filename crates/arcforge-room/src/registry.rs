//! Shared concurrent tables the coordinator keeps: the games map, the
//! user→room index, per-user locks, and per-game-kind waiting queues.
//!
//! A [`GameInstance`](crate::instance::GameInstance) is plain data, so
//! the table lock held during a lookup or insert *is* the thing
//! serializing access to it — one lock per table, never one giant lock
//! for everything.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use arcforge_protocol::{PlayerId, RoomId};
use tokio::sync::Mutex as AsyncMutex;

/// A plain mutex-guarded map. Used for the `Games` table (`RoomId` →
/// game cell) and the `UserRooms` index (`PlayerId` → `RoomId`).
pub struct Registry<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V> Registry<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, V>> {
        self.inner.lock().expect("registry mutex poisoned")
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.lock().insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn keys_snapshot(&self) -> Vec<K> {
        self.lock().keys().cloned().collect()
    }

    /// Runs `f` with shared access to the entire map under the lock.
    /// Kept narrow and short-lived — callers must not block inside it.
    pub fn with<R>(&self, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        f(&self.lock())
    }
}

impl<K: Eq + Hash + Clone, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user locks (`Users[user_id]` in the design notes): one
/// `tokio::sync::Mutex<()>` per connected player, created lazily on
/// first use and never removed — a player's lock identity is stable for
/// the life of their session so lock-ordering (`Users[u]` before any
/// per-game lock) is easy to reason about.
pub struct UserLocks {
    inner: Mutex<HashMap<PlayerId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns this player's lock, creating it if this is the first time
    /// they've been seen.
    pub fn get_or_create(&self, player: PlayerId) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().expect("user locks mutex poisoned");
        map.entry(player)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops a player's lock entirely — called once a disconnect is
    /// final (no reconnection grace period pending).
    pub fn remove(&self, player: PlayerId) {
        self.inner
            .lock()
            .expect("user locks mutex poisoned")
            .remove(&player);
    }
}

impl Default for UserLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-game-kind FIFOs of rooms that are still waiting for more players.
///
/// Mirrors the design notes' requirement that waiting queues be pairwise
/// disjoint across kinds and that a room appear in at most one queue at
/// a time — enforced here by always removing a room from its queue
/// before it's considered for placement elsewhere.
pub struct WaitingQueues {
    inner: Mutex<HashMap<String, VecDeque<RoomId>>>,
}

impl WaitingQueues {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Appends `room` to `kind`'s waiting queue.
    pub fn push(&self, kind: &str, room: RoomId) {
        self.inner
            .lock()
            .expect("waiting queues mutex poisoned")
            .entry(kind.to_string())
            .or_default()
            .push_back(room);
    }

    /// Pops the oldest waiting room for `kind`, if any.
    pub fn pop(&self, kind: &str) -> Option<RoomId> {
        self.inner
            .lock()
            .expect("waiting queues mutex poisoned")
            .get_mut(kind)
            .and_then(|q| q.pop_front())
    }

    /// Returns the front room for `kind` without removing it, e.g. for
    /// deciding whether to place a new joiner there.
    pub fn peek(&self, kind: &str) -> Option<RoomId> {
        self.inner
            .lock()
            .expect("waiting queues mutex poisoned")
            .get(kind)
            .and_then(|q| q.front().copied())
    }

    /// Removes a specific room from `kind`'s queue, wherever it sits —
    /// used when a room becomes ready or is torn down while still
    /// waiting.
    pub fn remove(&self, kind: &str, room: RoomId) {
        if let Some(q) = self
            .inner
            .lock()
            .expect("waiting queues mutex poisoned")
            .get_mut(kind)
        {
            q.retain(|&r| r != room);
        }
    }

    /// Snapshot of every `(kind, room)` pair still waiting, for the
    /// debug endpoint.
    pub fn snapshot(&self) -> Vec<(String, RoomId)> {
        self.inner
            .lock()
            .expect("waiting queues mutex poisoned")
            .iter()
            .flat_map(|(kind, q)| q.iter().map(move |&r| (kind.clone(), r)))
            .collect()
    }
}

impl Default for WaitingQueues {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_insert_get_remove() {
        let reg: Registry<RoomId, u32> = Registry::new();
        reg.insert(RoomId(1), 42);
        assert_eq!(reg.get_cloned(&RoomId(1)), Some(42));
        assert_eq!(reg.remove(&RoomId(1)), Some(42));
        assert_eq!(reg.get_cloned(&RoomId(1)), None);
    }

    #[test]
    fn test_user_locks_same_player_gets_same_lock() {
        let locks = UserLocks::new();
        let a = locks.get_or_create(PlayerId(1));
        let b = locks.get_or_create(PlayerId(1));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_user_locks_different_players_get_different_locks() {
        let locks = UserLocks::new();
        let a = locks.get_or_create(PlayerId(1));
        let b = locks.get_or_create(PlayerId(2));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_waiting_queues_fifo_order() {
        let q = WaitingQueues::new();
        q.push("connect_four", RoomId(1));
        q.push("connect_four", RoomId(2));
        assert_eq!(q.pop("connect_four"), Some(RoomId(1)));
        assert_eq!(q.pop("connect_four"), Some(RoomId(2)));
        assert_eq!(q.pop("connect_four"), None);
    }

    #[test]
    fn test_waiting_queues_disjoint_across_kinds() {
        let q = WaitingQueues::new();
        q.push("connect_four", RoomId(1));
        q.push("grid_arena", RoomId(2));
        assert_eq!(q.pop("connect_four"), Some(RoomId(1)));
        assert_eq!(q.pop("grid_arena"), Some(RoomId(2)));
    }

    #[test]
    fn test_waiting_queues_remove_specific_room() {
        let q = WaitingQueues::new();
        q.push("connect_four", RoomId(1));
        q.push("connect_four", RoomId(2));
        q.remove("connect_four", RoomId(1));
        assert_eq!(q.pop("connect_four"), Some(RoomId(2)));
    }
}
