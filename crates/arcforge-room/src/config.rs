//! Process-scoped server configuration.
//!
//! Everything the coordinator needs to know about capacity limits and the
//! game kinds it's willing to host lives in one `ServerConfig`, built once
//! at startup and passed around behind an `Arc` — never read back out of a
//! global. Game status itself is whatever
//! [`GameInstance::tick`](crate::instance::GameInstance::tick) reports
//! each tick (`GameStatus::Active`/`Reset`/`Done`/`Inactive`), since a
//! series of sub-games cycles between active and reset rather than
//! moving through a linear state machine once.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-game-kind limits and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameKindConfig {
    /// Minimum seated players before the instance can `activate`.
    pub min_players: usize,
    /// Maximum seated players (`is_full` threshold).
    pub max_players: usize,
    /// Whether joiners beyond `max_players` may attach as spectators
    /// instead of being turned away.
    pub allow_spectators: bool,
    /// Ticks per second this kind's instances should run at, before the
    /// server-wide `max_fps` clamp.
    pub fps: u32,
    /// Default construction parameters, merged under whatever the
    /// client supplies in `create`/`join`.
    #[serde(default)]
    pub default_params: Value,
}

impl Default for GameKindConfig {
    fn default() -> Self {
        Self {
            min_players: 1,
            max_players: 2,
            allow_spectators: true,
            fps: 10,
            default_params: Value::Null,
        }
    }
}

/// Immutable, process-wide server configuration.
///
/// Constructed once via [`ServerConfig::builder`] and shared behind an
/// `Arc` — every coordinator method takes `&ServerConfig`, never reaches
/// for a global.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hard cap on concurrently active-or-waiting game instances. Sizes
    /// the [`crate::ids::RoomIdPool`].
    pub max_games: u32,
    /// Server-wide ceiling on any single game kind's requested `fps`.
    pub max_fps: u32,
    /// Wall-clock limit a single game instance may run before the
    /// driver force-ends it, regardless of game-reported status.
    pub max_game_length: Duration,
    /// Delay between a sub-game ending (`GameStatus::Reset`) and the
    /// next one starting, giving clients time to render the result.
    pub reset_timeout: Duration,
    /// Registered game kinds by name.
    pub kinds: HashMap<String, GameKindConfig>,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Looks up a registered kind's config.
    pub fn kind(&self, name: &str) -> Option<&GameKindConfig> {
        self.kinds.get(name)
    }

    /// Effective fps for a kind: the kind's requested rate, clamped to
    /// the server-wide maximum.
    pub fn effective_fps(&self, name: &str) -> u32 {
        let requested = self.kind(name).map(|k| k.fps).unwrap_or(10);
        requested.min(self.max_fps)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfigBuilder::new().build()
    }
}

/// Builder for [`ServerConfig`], following the same small-builder shape
/// as `ArcforgeServerBuilder` in the top-level crate.
pub struct ServerConfigBuilder {
    max_games: u32,
    max_fps: u32,
    max_game_length: Duration,
    reset_timeout: Duration,
    kinds: HashMap<String, GameKindConfig>,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_games: 500,
            max_fps: 60,
            max_game_length: Duration::from_secs(60 * 30),
            reset_timeout: Duration::from_secs(3),
            kinds: HashMap::new(),
        }
    }

    pub fn max_games(mut self, n: u32) -> Self {
        self.max_games = n;
        self
    }

    pub fn max_fps(mut self, n: u32) -> Self {
        self.max_fps = n;
        self
    }

    pub fn max_game_length(mut self, d: Duration) -> Self {
        self.max_game_length = d;
        self
    }

    pub fn reset_timeout(mut self, d: Duration) -> Self {
        self.reset_timeout = d;
        self
    }

    pub fn register_kind(mut self, name: impl Into<String>, config: GameKindConfig) -> Self {
        self.kinds.insert(name.into(), config);
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            max_games: self.max_games,
            max_fps: self.max_fps,
            max_game_length: self.max_game_length,
            reset_timeout: self.reset_timeout,
            kinds: self.kinds,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_registered_kinds() {
        let config = ServerConfig::default();
        assert!(config.kind("connect_four").is_none());
    }

    #[test]
    fn test_register_kind_round_trip() {
        let config = ServerConfig::builder()
            .register_kind("connect_four", GameKindConfig::default())
            .build();
        assert!(config.kind("connect_four").is_some());
    }

    #[test]
    fn test_effective_fps_clamped_to_server_max() {
        let config = ServerConfig::builder()
            .max_fps(30)
            .register_kind(
                "fast_kind",
                GameKindConfig {
                    fps: 120,
                    ..Default::default()
                },
            )
            .build();
        assert_eq!(config.effective_fps("fast_kind"), 30);
    }

    #[test]
    fn test_effective_fps_unregistered_kind_defaults_to_ten() {
        let config = ServerConfig::builder().max_fps(60).build();
        assert_eq!(config.effective_fps("unknown"), 10);
    }
}
