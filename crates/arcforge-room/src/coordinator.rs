//! The session coordinator: the single place that knows how to create,
//! join, leave, and act inside a game room, and that owns the tick
//! driver for every room it activates.
//!
//! Game instances are kept as plain data behind per-room locks, and a
//! background task is only spawned once a room actually starts ticking
//! — a room sitting in a waiting queue costs a table entry, not a task.
//!
//! # Lock ordering
//!
//! Every public method that mutates per-player state takes that
//! player's lock from [`UserLocks`] first, and only then (if at all)
//! the target room's lock. Locking a room without first holding the
//! acting player's lock is a bug — it's the one invariant this module
//! cannot check for you at compile time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use arcforge_protocol::{Action, GameStatus, PlayerId, RoomId, SessionEvent};
use arcforge_tick::TickScheduler;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::error::CoreError;
use crate::ids::RoomIdPool;
use crate::instance::{GameError, GameInstance, QueuedAction};
use crate::registry::{Registry, UserLocks, WaitingQueues};

/// Builds a fresh instance of one game kind from client-supplied and
/// server-default parameters, already merged.
pub type GameFactory =
    Box<dyn Fn(Value) -> Result<Box<dyn GameInstance>, CoreError> + Send + Sync>;

struct GameCell {
    kind: String,
    instance: Box<dyn GameInstance>,
    created_at: Instant,
}

struct Inner {
    config: Arc<ServerConfig>,
    id_pool: RoomIdPool,
    games: Registry<RoomId, Arc<AsyncMutex<GameCell>>>,
    user_rooms: Registry<PlayerId, RoomId>,
    user_locks: UserLocks,
    active: StdMutex<HashSet<RoomId>>,
    waiting: WaitingQueues,
    factories: StdMutex<std::collections::HashMap<String, GameFactory>>,
    broadcaster: Arc<dyn Broadcaster>,
}

/// Cheaply cloneable handle to the coordinator's shared state — clone it
/// into every connection task and every spawned driver the way
/// `ArcforgeServer` clones its `Arc<ServerState>`.
#[derive(Clone)]
pub struct Coordinator(Arc<Inner>);

impl Coordinator {
    pub fn new(config: ServerConfig, broadcaster: Arc<dyn Broadcaster>) -> Self {
        let id_pool = RoomIdPool::new(config.max_games);
        Self(Arc::new(Inner {
            config: Arc::new(config),
            id_pool,
            games: Registry::new(),
            user_rooms: Registry::new(),
            user_locks: UserLocks::new(),
            active: StdMutex::new(HashSet::new()),
            waiting: WaitingQueues::new(),
            factories: StdMutex::new(std::collections::HashMap::new()),
            broadcaster,
        }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.0.config
    }

    /// Registers a game kind's constructor. Call once at startup for
    /// every kind named in `config.kinds`, before accepting connections.
    pub fn register_kind(&self, name: impl Into<String>, factory: GameFactory) {
        self.0
            .factories
            .lock()
            .expect("factories mutex poisoned")
            .insert(name.into(), factory);
    }

    // -- Connection lifecycle ------------------------------------------

    /// Registers that `player` is online. Idempotent.
    pub async fn connect(&self, player: PlayerId) {
        self.0.user_locks.get_or_create(player);
    }

    /// Tears down whatever room `player` was in. The reconnection grace
    /// period (if any) is a session-layer concern applied before this
    /// is called — by the time `disconnect` runs, the departure is
    /// final.
    pub async fn disconnect(&self, player: PlayerId) -> Result<(), CoreError> {
        let result = self.leave(player).await;
        self.0.user_locks.remove(player);
        result
    }

    // -- Matchmaking events ----------------------------------------------

    pub async fn create(
        &self,
        player: PlayerId,
        kind: &str,
        params: Value,
    ) -> Result<(), CoreError> {
        let lock = self.0.user_locks.get_or_create(player);
        let _guard = lock.lock().await;
        if self.0.user_rooms.contains(&player) {
            return Err(CoreError::Consistency(format!(
                "{player} is already in a room"
            )));
        }
        self.spawn_new_room(player, kind, params).await
    }

    pub async fn join(
        &self,
        player: PlayerId,
        kind: &str,
        create_if_not_found: bool,
        params: Value,
    ) -> Result<(), CoreError> {
        let lock = self.0.user_locks.get_or_create(player);
        let _guard = lock.lock().await;
        if self.0.user_rooms.contains(&player) {
            return Err(CoreError::Consistency(format!(
                "{player} is already in a room"
            )));
        }

        loop {
            let Some(room) = self.0.waiting.peek(kind) else {
                break;
            };
            let Some(cell_arc) = self.0.games.get_cloned(&room) else {
                // Stale entry: room was torn down without being popped.
                self.0.waiting.remove(kind, room);
                continue;
            };
            let mut cell = cell_arc.lock().await;
            if cell.instance.is_full() {
                // Another joiner filled it between peek and lock; it
                // should already have been popped when it became ready,
                // but guard against the race anyway.
                drop(cell);
                self.0.waiting.remove(kind, room);
                continue;
            }
            cell.instance
                .add_player(player)
                .map_err(|e| CoreError::Validation(e.to_string()))?;
            self.0.user_rooms.insert(player, room);
            let ready = cell.instance.is_ready();
            if ready {
                self.0.waiting.remove(kind, room);
                cell.instance.activate();
                self.mark_active(room);
            }
            let recipients = cell.instance.participants();
            let start_infos: Vec<_> = recipients
                .iter()
                .map(|&p| (p, cell.instance.to_json(p)))
                .collect();
            drop(cell);

            if ready {
                for (p, start_info) in start_infos {
                    self.0.broadcaster.send(
                        p,
                        SessionEvent::StartGame { spectating: false, start_info },
                    );
                }
                self.spawn_driver(room);
            } else {
                self.0
                    .broadcaster
                    .send(player, SessionEvent::Waiting { in_game: false });
            }
            return Ok(());
        }

        if create_if_not_found {
            self.spawn_new_room(player, kind, params).await
        } else {
            Err(CoreError::Consistency(format!(
                "no room waiting for kind '{kind}'"
            )))
        }
    }

    pub async fn leave(&self, player: PlayerId) -> Result<(), CoreError> {
        let lock = self.0.user_locks.get_or_create(player);
        let _guard = lock.lock().await;

        let room = self
            .0
            .user_rooms
            .remove(&player)
            .ok_or(CoreError::PlayerNotInRoom(player))?;
        let Some(cell_arc) = self.0.games.get_cloned(&room) else {
            return Err(CoreError::RoomNotFound(room));
        };

        let was_active = self.is_active(room);
        let (now_empty, still_ready, kind) = {
            let mut cell = cell_arc.lock().await;
            cell.instance.remove_player(player);
            cell.instance.remove_spectator(player);
            (
                cell.instance.is_empty(),
                cell.instance.is_ready(),
                cell.kind.clone(),
            )
        };

        if now_empty {
            self.cleanup_game(room, &kind).await;
            if was_active {
                self.0.broadcaster.send(
                    player,
                    SessionEvent::EndGame {
                        status: GameStatus::Inactive,
                        data: Value::Null,
                    },
                );
            } else {
                self.0.broadcaster.send(player, SessionEvent::EndLobby);
            }
        } else if was_active {
            if !still_ready {
                // The vacated seat dropped the instance below ready —
                // stop ticking it and put the room back up for a refill.
                self.unmark_active(room);
                {
                    let mut cell = cell_arc.lock().await;
                    cell.instance.deactivate();
                }
                self.0.waiting.push(&kind, room);
            }
        } else {
            self.0.broadcaster.send(player, SessionEvent::Waiting { in_game: true });
        }
        Ok(())
    }

    pub async fn action(&self, player: PlayerId, action: Action) -> Result<(), CoreError> {
        let lock = self.0.user_locks.get_or_create(player);
        let _guard = lock.lock().await;

        let room = self
            .0
            .user_rooms
            .get_cloned(&player)
            .ok_or(CoreError::PlayerNotInRoom(player))?;
        let cell_arc = self.0.games.get_cloned(&room).ok_or(CoreError::RoomNotFound(room))?;
        let mut cell = cell_arc.lock().await;

        if !cell.instance.is_active() {
            return Err(CoreError::Validation("game is not active".into()));
        }
        if !cell.instance.is_valid_action(player, &action) {
            return Err(CoreError::Validation("invalid action".into()));
        }
        cell.instance.enqueue_action(QueuedAction { player, action });
        Ok(())
    }

    // -- Internals -------------------------------------------------------

    fn is_active(&self, room: RoomId) -> bool {
        self.0
            .active
            .lock()
            .expect("active set mutex poisoned")
            .contains(&room)
    }

    fn mark_active(&self, room: RoomId) {
        self.0
            .active
            .lock()
            .expect("active set mutex poisoned")
            .insert(room);
    }

    fn unmark_active(&self, room: RoomId) {
        self.0
            .active
            .lock()
            .expect("active set mutex poisoned")
            .remove(&room);
    }

    async fn cleanup_game(&self, room: RoomId, kind: &str) {
        self.0.games.remove(&room);
        self.unmark_active(room);
        self.0.waiting.remove(kind, room);
        self.0.id_pool.release(room);
        debug!(room = %room, kind, "room cleaned up");
    }

    async fn spawn_new_room(
        &self,
        player: PlayerId,
        kind: &str,
        params: Value,
    ) -> Result<(), CoreError> {
        let Some(kind_cfg) = self.0.config.kind(kind).cloned() else {
            let err = format!("unknown game kind '{kind}'");
            self.0
                .broadcaster
                .send(player, SessionEvent::CreationFailed { error: err.clone() });
            return Err(CoreError::Validation(err));
        };

        let Some(room) = self.0.id_pool.acquire() else {
            let err = "server is at maximum capacity".to_string();
            self.0
                .broadcaster
                .send(player, SessionEvent::CreationFailed { error: err.clone() });
            return Err(CoreError::Capacity(err));
        };

        let merged = merge_params(&kind_cfg.default_params, &params);
        let instance = {
            let factories = self.0.factories.lock().expect("factories mutex poisoned");
            let Some(factory) = factories.get(kind) else {
                drop(factories);
                self.0.id_pool.release(room);
                let err = format!("no factory registered for '{kind}'");
                self.0
                    .broadcaster
                    .send(player, SessionEvent::CreationFailed { error: err.clone() });
                return Err(CoreError::Validation(err));
            };
            factory(merged)
        };

        let mut instance = match instance {
            Ok(instance) => instance,
            Err(e) => {
                self.0.id_pool.release(room);
                self.0
                    .broadcaster
                    .send(player, SessionEvent::CreationFailed { error: e.to_string() });
                return Err(e);
            }
        };

        if let Err(e) = instance.add_player(player) {
            self.0.id_pool.release(room);
            self.0
                .broadcaster
                .send(player, SessionEvent::CreationFailed { error: e.to_string() });
            return Err(CoreError::Validation(e.to_string()));
        }

        let ready = instance.is_ready();
        let cell = GameCell {
            kind: kind.to_string(),
            instance,
            created_at: Instant::now(),
        };
        let cell_arc = Arc::new(AsyncMutex::new(cell));
        self.0.games.insert(room, cell_arc.clone());
        self.0.user_rooms.insert(player, room);

        if ready {
            let state = {
                let mut cell = cell_arc.lock().await;
                cell.instance.activate();
                cell.instance.to_json(player)
            };
            self.mark_active(room);
            self.0.broadcaster.send(
                player,
                SessionEvent::StartGame { spectating: false, start_info: state },
            );
            self.spawn_driver(room);
        } else {
            self.0.waiting.push(kind, room);
            self.0
                .broadcaster
                .send(player, SessionEvent::Waiting { in_game: false });
        }

        info!(room = %room, kind, player = %player, "room created");
        Ok(())
    }

    /// Spawns the tick loop for a newly activated room. Runs until the
    /// instance reports `Done`, errors, or exceeds `max_game_length`.
    fn spawn_driver(&self, room: RoomId) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_driver(room).await;
        });
    }

    async fn run_driver(&self, room: RoomId) {
        let Some(cell_arc) = self.0.games.get_cloned(&room) else {
            return;
        };
        let kind = {
            let cell = cell_arc.lock().await;
            cell.kind.clone()
        };
        let fps = self.0.config.effective_fps(&kind).max(1);
        let mut scheduler = TickScheduler::with_rate(fps);
        let max_game_length = self.0.config.max_game_length;
        let reset_timeout = self.0.config.reset_timeout;

        loop {
            scheduler.wait_for_tick().await;

            let mut cell = cell_arc.lock().await;
            if cell.created_at.elapsed() > max_game_length {
                warn!(room = %room, "max game length exceeded — forcing end");
                let recipients = cell.instance.participants();
                drop(cell);
                self.broadcast_all(
                    &recipients,
                    SessionEvent::EndGame { status: GameStatus::Done, data: Value::Null },
                );
                self.cleanup_game(room, &kind).await;
                return;
            }

            let outcome = guarded_tick(cell.instance.as_mut());
            scheduler.record_tick_end();

            match outcome {
                Ok(GameStatus::Active) => {
                    let recipients = cell.instance.participants();
                    let events: Vec<_> = recipients
                        .iter()
                        .map(|&p| (p, SessionEvent::StatePong { state: cell.instance.get_state(p) }))
                        .collect();
                    drop(cell);
                    for (p, ev) in events {
                        self.0.broadcaster.send(p, ev);
                    }
                }
                Ok(GameStatus::Reset) => {
                    let recipients = cell.instance.participants();
                    let data = cell.instance.get_data();
                    let events: Vec<_> = recipients
                        .iter()
                        .map(|&p| {
                            (
                                p,
                                SessionEvent::ResetGame {
                                    state: cell.instance.get_state(p),
                                    timeout_ms: reset_timeout.as_millis() as u64,
                                    data: data.clone(),
                                },
                            )
                        })
                        .collect();
                    cell.instance.deactivate();
                    drop(cell);
                    for (p, ev) in events {
                        self.0.broadcaster.send(p, ev);
                    }
                    tokio::time::sleep(reset_timeout).await;
                    let mut cell = cell_arc.lock().await;
                    cell.instance.reset();
                    cell.instance.activate();
                }
                Ok(GameStatus::Done) => {
                    let recipients = cell.instance.participants();
                    let data = cell.instance.get_data();
                    drop(cell);
                    self.broadcast_all(
                        &recipients,
                        SessionEvent::EndGame { status: GameStatus::Done, data },
                    );
                    self.cleanup_game(room, &kind).await;
                    return;
                }
                Ok(GameStatus::Inactive) => {
                    drop(cell);
                    return;
                }
                Err(GameError::InvalidAction(msg))
                | Err(GameError::Internal(msg))
                | Err(GameError::Panicked(msg)) => {
                    let recipients = cell.instance.participants();
                    drop(cell);
                    self.broadcast_all(
                        &recipients,
                        SessionEvent::GameError { error: msg, data: Value::Null },
                    );
                    self.cleanup_game(room, &kind).await;
                    return;
                }
            }
        }
    }

    fn broadcast_all(&self, recipients: &[PlayerId], event: SessionEvent) {
        self.0.broadcaster.broadcast(recipients, event);
    }

    /// Snapshot for the debug endpoint: see [`crate::debug::DebugSnapshot`].
    pub fn snapshot(&self) -> crate::debug::DebugSnapshot {
        crate::debug::DebugSnapshot {
            active_games: self
                .0
                .active
                .lock()
                .expect("active set mutex poisoned")
                .iter()
                .copied()
                .collect(),
            waiting_games: self.0.waiting.snapshot(),
            games: self.0.games.keys_snapshot(),
            user_rooms: self
                .0
                .user_rooms
                .with(|m| m.iter().map(|(&p, &r)| (p, r)).collect()),
            free_ids: self.0.id_pool.free_count(),
            capacity: self.0.id_pool.capacity(),
        }
    }
}

/// Calls `tick()` behind `catch_unwind`, so a panic inside one game
/// kind's logic can't take the whole driver task down with it — the
/// panic becomes a [`GameError::Panicked`], which `run_driver` handles
/// the same way as any other tick error: broadcast, then
/// [`Coordinator::cleanup_game`].
fn guarded_tick(instance: &mut dyn GameInstance) -> Result<GameStatus, GameError> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| instance.tick())) {
        Ok(outcome) => outcome,
        Err(payload) => Err(GameError::Panicked(panic_message(&payload))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn merge_params(defaults: &Value, overrides: &Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(defaults), Value::Object(overrides)) => {
            let mut merged = defaults.clone();
            for (k, v) in overrides {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        (_, Value::Null) => defaults.clone(),
        (Value::Null, overrides) => overrides.clone(),
        (_, overrides) => overrides.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::GameInstance;
    use serde_json::json;
    use std::sync::Mutex as StdSyncMutex;

    #[derive(Default)]
    struct RecordingBroadcaster {
        events: StdSyncMutex<Vec<(PlayerId, SessionEvent)>>,
    }

    impl Broadcaster for RecordingBroadcaster {
        fn send(&self, player: PlayerId, event: SessionEvent) {
            self.events.lock().unwrap().push((player, event));
        }
    }

    impl RecordingBroadcaster {
        fn events_for(&self, player: PlayerId) -> Vec<SessionEvent> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| *p == player)
                .map(|(_, e)| e.clone())
                .collect()
        }
    }

    /// A minimal two-player game: ready once both seats are filled,
    /// finishes after one tick. Enough to exercise create/join/action/
    /// leave without a real game's rules.
    struct ToyGame {
        players: Vec<PlayerId>,
        max_players: usize,
        ticked: bool,
        last_action: Option<Value>,
    }

    impl GameInstance for ToyGame {
        fn is_full(&self) -> bool {
            self.players.len() >= self.max_players
        }
        fn is_ready(&self) -> bool {
            self.players.len() == self.max_players
        }
        fn is_empty(&self) -> bool {
            self.players.is_empty()
        }
        fn is_active(&self) -> bool {
            self.is_ready() && !self.ticked
        }
        fn activate(&mut self) {}
        fn deactivate(&mut self) {}
        fn is_finished(&self) -> bool {
            self.ticked
        }
        fn curr_game_over(&self) -> bool {
            self.ticked
        }
        fn needs_reset(&self) -> bool {
            false
        }
        fn reset(&mut self) {
            self.ticked = false;
        }
        fn add_player(&mut self, player: PlayerId) -> Result<(), GameError> {
            if self.is_full() {
                return Err(GameError::InvalidAction("full".into()));
            }
            self.players.push(player);
            Ok(())
        }
        fn add_spectator(&mut self, _player: PlayerId) {}
        fn remove_player(&mut self, player: PlayerId) {
            self.players.retain(|&p| p != player);
        }
        fn remove_spectator(&mut self, _player: PlayerId) {}
        fn enqueue_action(&mut self, action: QueuedAction) {
            self.last_action = Some(action.action.0);
        }
        fn is_valid_action(&self, player: PlayerId, _action: &Action) -> bool {
            self.players.contains(&player)
        }
        fn tick(&mut self) -> Result<GameStatus, GameError> {
            self.ticked = true;
            Ok(GameStatus::Done)
        }
        fn get_state(&self, _recipient: PlayerId) -> Value {
            json!({"players": self.players.len()})
        }
        fn participants(&self) -> Vec<PlayerId> {
            self.players.clone()
        }
    }

    fn toy_coordinator() -> (Coordinator, Arc<RecordingBroadcaster>) {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let config = ServerConfig::builder()
            .register_kind(
                "toy",
                crate::config::GameKindConfig {
                    min_players: 2,
                    max_players: 2,
                    allow_spectators: false,
                    fps: 50,
                    default_params: Value::Null,
                },
            )
            .build();
        let coordinator = Coordinator::new(config, broadcaster.clone());
        coordinator.register_kind(
            "toy",
            Box::new(|_params| {
                Ok(Box::new(ToyGame {
                    players: vec![],
                    max_players: 2,
                    ticked: false,
                    last_action: None,
                }) as Box<dyn GameInstance>)
            }),
        );
        (coordinator, broadcaster)
    }

    #[tokio::test]
    async fn test_create_places_first_player_in_waiting_room() {
        let (coordinator, broadcaster) = toy_coordinator();
        coordinator.create(PlayerId(1), "toy", Value::Null).await.unwrap();
        let events = broadcaster.events_for(PlayerId(1));
        assert!(matches!(events[0], SessionEvent::Waiting { .. }));
    }

    #[tokio::test]
    async fn test_join_fills_waiting_room_and_activates() {
        let (coordinator, broadcaster) = toy_coordinator();
        coordinator.create(PlayerId(1), "toy", Value::Null).await.unwrap();
        coordinator
            .join(PlayerId(2), "toy", true, Value::Null)
            .await
            .unwrap();
        let events = broadcaster.events_for(PlayerId(2));
        assert!(matches!(events[0], SessionEvent::StartGame { .. }));
    }

    #[tokio::test]
    async fn test_create_twice_without_leaving_is_consistency_error() {
        let (coordinator, _b) = toy_coordinator();
        coordinator.create(PlayerId(1), "toy", Value::Null).await.unwrap();
        let err = coordinator
            .create(PlayerId(1), "toy", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Consistency(_)));
    }

    #[tokio::test]
    async fn test_unknown_kind_returns_validation_error_and_creation_failed() {
        let (coordinator, broadcaster) = toy_coordinator();
        let err = coordinator
            .create(PlayerId(1), "nope", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        let events = broadcaster.events_for(PlayerId(1));
        assert!(matches!(events[0], SessionEvent::CreationFailed { .. }));
    }

    #[tokio::test]
    async fn test_capacity_exhaustion_returns_capacity_error() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let config = ServerConfig::builder()
            .max_games(1)
            .register_kind("toy", crate::config::GameKindConfig::default())
            .build();
        let coordinator = Coordinator::new(config, broadcaster.clone());
        coordinator.register_kind(
            "toy",
            Box::new(|_| {
                Ok(Box::new(ToyGame {
                    players: vec![],
                    max_players: 2,
                    ticked: false,
                    last_action: None,
                }) as Box<dyn GameInstance>)
            }),
        );
        coordinator.create(PlayerId(1), "toy", Value::Null).await.unwrap();
        let err = coordinator
            .create(PlayerId(2), "toy", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Capacity(_)));
    }

    #[tokio::test]
    async fn test_leave_empty_room_reclaims_id_and_sends_end_lobby() {
        let (coordinator, broadcaster) = toy_coordinator();
        coordinator.create(PlayerId(1), "toy", Value::Null).await.unwrap();
        coordinator.leave(PlayerId(1)).await.unwrap();
        let events = broadcaster.events_for(PlayerId(1));
        assert!(matches!(events.last().unwrap(), SessionEvent::EndLobby));
        assert_eq!(coordinator.snapshot().free_ids, coordinator.snapshot().capacity);
    }

    #[tokio::test]
    async fn test_leave_without_room_is_consistency_error() {
        let (coordinator, _b) = toy_coordinator();
        let err = coordinator.leave(PlayerId(42)).await.unwrap_err();
        assert!(matches!(err, CoreError::PlayerNotInRoom(_)));
    }

    #[tokio::test]
    async fn test_action_before_room_is_active_is_validation_error() {
        let (coordinator, _b) = toy_coordinator();
        coordinator.create(PlayerId(1), "toy", Value::Null).await.unwrap();
        let err = coordinator
            .action(PlayerId(1), Action::new(json!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_action_by_non_member_is_player_not_in_room() {
        let (coordinator, _b) = toy_coordinator();
        let err = coordinator
            .action(PlayerId(99), Action::new(json!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PlayerNotInRoom(_)));
    }

    #[tokio::test]
    async fn test_full_series_drives_game_to_completion() {
        let (coordinator, broadcaster) = toy_coordinator();
        coordinator.create(PlayerId(1), "toy", Value::Null).await.unwrap();
        coordinator
            .join(PlayerId(2), "toy", true, Value::Null)
            .await
            .unwrap();

        // The driver task ticks independently; give it a moment.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let events = broadcaster.events_for(PlayerId(1));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::EndGame { status: GameStatus::Done, .. })));
    }
}
