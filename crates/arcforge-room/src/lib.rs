//! Session coordination and game hosting for Arcforge.
//!
//! A [`Coordinator`] owns every room on the server: a bounded pool of
//! room IDs, the games table, the waiting queues for matchmaking, and
//! one per-user lock per connected player. It hosts heterogeneous game
//! kinds side by side as `Box<dyn GameInstance>` behind a per-room lock,
//! and spawns the tick driver only for rooms that are actually active.

mod broadcast;
mod config;
mod coordinator;
mod debug;
mod error;
mod ids;
mod instance;
mod npc;
mod registry;
mod turns;

pub use broadcast::Broadcaster;
pub use config::{GameKindConfig, ServerConfig, ServerConfigBuilder};
pub use coordinator::{Coordinator, GameFactory};
pub use debug::DebugSnapshot;
pub use error::CoreError;
pub use ids::RoomIdPool;
pub use instance::{GameError, GameInstance, QueuedAction};
pub use npc::{NpcPolicy, NpcSupport};
pub use registry::{Registry, UserLocks, WaitingQueues};
pub use turns::TurnSupport;
