//! NPC (bot) player support, composed into a [`GameInstance`](crate::instance::GameInstance)
//! rather than bolted on via inheritance.
//!
//! A concrete game kind embeds an [`NpcSupport`] field and delegates to
//! it from its own `add_player`/`remove_player`/`tick` — tracking which
//! seats are human vs. bot, running one worker task per bot, and
//! feeding each worker a single-slot "latest state wins" inbox — the
//! same "has-a" pattern `arcforge-tick`'s `TickScheduler` is meant to be
//! embedded with inside a room loop.

use std::collections::HashSet;
use std::sync::Arc;

use arcforge_protocol::{Action, PlayerId};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A bot's decision function: given the latest state snapshot, produce
/// the action it wants to take this turn.
///
/// Kept synchronous and side-effect-free so policies are trivial to unit
/// test in isolation from the NPC worker plumbing.
pub trait NpcPolicy: Send + Sync + 'static {
    fn decide(&self, state: &Value) -> Value;
}

/// Wraps a plain closure as an [`NpcPolicy`].
impl<F> NpcPolicy for F
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    fn decide(&self, state: &Value) -> Value {
        (self)(state)
    }
}

struct NpcWorker {
    state_tx: watch::Sender<Value>,
    handle: JoinHandle<()>,
}

/// Bookkeeping for a game instance's human/NPC roster and the background
/// policy workers that produce NPC actions.
///
/// `state_tx` for each NPC is a `tokio::sync::watch` channel: pushing a
/// new value always overwrites whatever the worker hasn't consumed yet,
/// giving exactly the "latest state wins, never backs up" semantics a
/// fast-ticking game needs from a slower policy.
pub struct NpcSupport {
    human_players: HashSet<PlayerId>,
    workers: std::collections::HashMap<PlayerId, NpcWorker>,
    action_tx: mpsc::Sender<(PlayerId, Value)>,
    action_rx: mpsc::Receiver<(PlayerId, Value)>,
    /// Recompute NPC actions only every `ticks_per_ai_action` ticks —
    /// most policies are too slow (or too strong) to run every frame.
    ticks_per_ai_action: u32,
    tick_counter: u32,
    /// If true, `drain_actions` waits briefly for every NPC to respond
    /// before returning, instead of taking whatever has already arrived.
    pub block_for_ai: bool,
}

impl NpcSupport {
    pub fn new(ticks_per_ai_action: u32, block_for_ai: bool) -> Self {
        let (action_tx, action_rx) = mpsc::channel(32);
        Self {
            human_players: HashSet::new(),
            workers: std::collections::HashMap::new(),
            action_tx,
            action_rx,
            ticks_per_ai_action: ticks_per_ai_action.max(1),
            tick_counter: 0,
            block_for_ai: false || block_for_ai,
        }
    }

    pub fn add_human(&mut self, player: PlayerId) {
        self.human_players.insert(player);
    }

    pub fn remove_human(&mut self, player: PlayerId) {
        self.human_players.remove(&player);
    }

    /// Spawns a background task driving `policy` for `player`, seeded
    /// with `initial_state`.
    pub fn add_npc(&mut self, player: PlayerId, policy: Arc<dyn NpcPolicy>, initial_state: Value) {
        let (state_tx, mut state_rx) = watch::channel(initial_state);
        let action_tx = self.action_tx.clone();
        let handle = tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = state_rx.borrow_and_update().clone();
                let action = policy.decide(&state);
                if action_tx.send((player, action)).await.is_err() {
                    break;
                }
            }
        });
        self.workers.insert(player, NpcWorker { state_tx, handle });
    }

    pub fn remove_npc(&mut self, player: PlayerId) {
        if let Some(worker) = self.workers.remove(&player) {
            worker.handle.abort();
        }
    }

    pub fn is_npc(&self, player: PlayerId) -> bool {
        self.workers.contains_key(&player)
    }

    pub fn human_count(&self) -> usize {
        self.human_players.len()
    }

    pub fn has_any_human(&self) -> bool {
        !self.human_players.is_empty()
    }

    /// Pushes the latest state to every NPC worker, throttled to fire
    /// only every `ticks_per_ai_action` ticks. Call once per
    /// `GameInstance::tick`.
    pub fn publish_state(&mut self, state: &Value) {
        self.tick_counter += 1;
        if self.tick_counter % self.ticks_per_ai_action != 0 {
            return;
        }
        for worker in self.workers.values() {
            // A closed receiver (worker panicked) is not fatal to the
            // instance — that NPC simply stops acting.
            let _ = worker.state_tx.send(state.clone());
        }
    }

    /// Collects every action that's arrived since the last call.
    ///
    /// Non-blocking by default. When [`block_for_ai`](Self::block_for_ai)
    /// is set, waits up to `budget` for at least one action so a
    /// synchronous-feeling bot doesn't get skipped every other tick.
    pub fn drain_actions(&mut self, budget: std::time::Duration) -> Vec<(PlayerId, Action)> {
        let mut out = Vec::new();
        if self.block_for_ai && !self.workers.is_empty() {
            let deadline = std::time::Instant::now() + budget;
            while out.is_empty() && std::time::Instant::now() < deadline {
                match self.action_rx.try_recv() {
                    Ok((p, v)) => out.push((p, Action::new(v))),
                    Err(mpsc::error::TryRecvError::Empty) => {
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                    Err(mpsc::error::TryRecvError::Disconnected) => break,
                }
            }
        }
        while let Ok((p, v)) = self.action_rx.try_recv() {
            out.push((p, Action::new(v)));
        }
        out
    }
}

impl Drop for NpcSupport {
    fn drop(&mut self) {
        for worker in self.workers.values() {
            worker.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AlwaysColumnZero;
    impl NpcPolicy for AlwaysColumnZero {
        fn decide(&self, _state: &Value) -> Value {
            json!({"column": 0})
        }
    }

    #[tokio::test]
    async fn test_npc_worker_responds_to_published_state() {
        let mut support = NpcSupport::new(1, true);
        support.add_npc(PlayerId(2), Arc::new(AlwaysColumnZero), json!({}));
        support.publish_state(&json!({"turn": 1}));

        let actions = support.drain_actions(std::time::Duration::from_millis(200));
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].0, PlayerId(2));
        assert_eq!(actions[0].1 .0["column"], 0);
    }

    #[test]
    fn test_ticks_per_ai_action_throttles_publish() {
        let mut support = NpcSupport::new(3, false);
        // tick_counter goes 1,2,3,4 — only multiples of 3 should publish.
        // We can't observe the watch channel directly without a worker,
        // but publish_state must not panic on any cadence.
        support.publish_state(&json!(1));
        support.publish_state(&json!(2));
        support.publish_state(&json!(3));
    }

    #[test]
    fn test_human_bookkeeping() {
        let mut support = NpcSupport::new(1, false);
        assert!(!support.has_any_human());
        support.add_human(PlayerId(1));
        assert!(support.has_any_human());
        assert_eq!(support.human_count(), 1);
        support.remove_human(PlayerId(1));
        assert!(!support.has_any_human());
    }

    #[test]
    fn test_non_blocking_drain_returns_empty_when_no_actions_yet() {
        let mut support = NpcSupport::new(1, false);
        let actions = support.drain_actions(std::time::Duration::from_millis(1));
        assert!(actions.is_empty());
    }
}
