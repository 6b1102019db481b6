//! Bounded, reusable room-ID allocation.
//!
//! The coordinator hands out [`RoomId`]s from a fixed range `[0, capacity)`
//! rather than an ever-growing counter — a server configured for
//! `max_games = 500` never needs an ID above 499, no matter how many rooms
//! have come and gone. Reclaimed IDs go back into circulation immediately.

use std::collections::VecDeque;
use std::sync::Mutex;

use arcforge_protocol::RoomId;

/// A fixed-capacity pool of room IDs, backed by a FIFO free list and a
/// free/in-use bitmap.
///
/// The bitmap is the source of truth; the FIFO just gives out IDs in a
/// round-robin-ish order so a freshly-released ID isn't immediately
/// reused ahead of IDs that have been free longer (makes debug dumps and
/// logs easier to read — IDs churn less). Entries can be pushed onto the
/// queue more than once if a caller mistakenly releases the same ID
/// twice; [`acquire`](Self::acquire) filters those stale duplicates
/// against the bitmap rather than handing out an ID that's actually
/// still in use.
pub struct RoomIdPool {
    capacity: u32,
    inner: Mutex<Inner>,
}

struct Inner {
    /// `free_map[i]` is `true` when room ID `i` is available.
    free_map: Vec<bool>,
    /// Candidate free IDs, front-to-back oldest-released-first. May
    /// contain stale entries for already-reallocated IDs.
    free_queue: VecDeque<u32>,
}

impl RoomIdPool {
    /// Creates a pool with every ID in `[0, capacity)` initially free.
    pub fn new(capacity: u32) -> Self {
        let free_queue = (0..capacity).collect();
        Self {
            capacity,
            inner: Mutex::new(Inner {
                free_map: vec![true; capacity as usize],
                free_queue,
            }),
        }
    }

    /// Total number of IDs this pool can hand out at once.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Takes the next available ID, or `None` if the pool is exhausted
    /// (every ID in `[0, capacity)` is currently in use).
    pub fn acquire(&self) -> Option<RoomId> {
        let mut inner = self.inner.lock().expect("room id pool poisoned");
        while let Some(id) = inner.free_queue.pop_front() {
            let slot = &mut inner.free_map[id as usize];
            if *slot {
                *slot = false;
                return Some(RoomId(id));
            }
            // Stale entry: this id was already reacquired since it was
            // queued. Skip it and keep looking.
        }
        None
    }

    /// Returns an ID to the pool, making it available for a future
    /// [`acquire`](Self::acquire).
    ///
    /// Releasing an ID that's already free is a caller bug but must not
    /// corrupt the pool — it's a no-op beyond re-queuing the id, which
    /// `acquire`'s staleness filter will skip if it was already free and
    /// handed out again in the meantime. Releasing one that was never
    /// issued by this pool (out of range) is ignored.
    pub fn release(&self, id: RoomId) {
        let mut inner = self.inner.lock().expect("room id pool poisoned");
        let Some(slot) = inner.free_map.get_mut(id.0 as usize) else {
            return;
        };
        if !*slot {
            *slot = true;
            inner.free_queue.push_back(id.0);
        }
    }

    /// Number of IDs currently free (for the debug/metrics snapshot).
    pub fn free_count(&self) -> u32 {
        let inner = self.inner.lock().expect("room id pool poisoned");
        inner.free_map.iter().filter(|&&free| free).count() as u32
    }

    /// `true` if `id` is currently marked in use by this pool.
    pub fn is_allocated(&self, id: RoomId) -> bool {
        let inner = self.inner.lock().expect("room id pool poisoned");
        inner
            .free_map
            .get(id.0 as usize)
            .map(|&free| !free)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_hands_out_distinct_ids_up_to_capacity() {
        let pool = RoomIdPool::new(3);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_release_makes_id_available_again() {
        let pool = RoomIdPool::new(1);
        let id = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        pool.release(id);
        assert_eq!(pool.acquire(), Some(id));
    }

    #[test]
    fn test_double_release_does_not_corrupt_pool() {
        let pool = RoomIdPool::new(2);
        let a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        pool.release(a);
        pool.release(a); // caller bug: releasing twice
        // Only one slot should actually be free, no matter how many
        // times `a` was queued.
        assert_eq!(pool.free_count(), 1);
        let reacquired = pool.acquire().unwrap();
        assert_eq!(reacquired, a);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_release_out_of_range_is_ignored() {
        let pool = RoomIdPool::new(1);
        pool.release(RoomId(99));
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_free_count_tracks_acquisitions() {
        let pool = RoomIdPool::new(4);
        assert_eq!(pool.free_count(), 4);
        pool.acquire();
        pool.acquire();
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_is_allocated() {
        let pool = RoomIdPool::new(2);
        let id = pool.acquire().unwrap();
        assert!(pool.is_allocated(id));
        pool.release(id);
        assert!(!pool.is_allocated(id));
    }
}
