//! The session manager: tracks all active player sessions.
//!
//! Responsible for creating sessions on authentication, tracking
//! connected/disconnected state, validating reconnection tokens, and
//! expiring sessions once the grace period lapses.
//!
//! # Concurrency
//!
//! `SessionManager` is not internally synchronized — it's owned by a
//! single task and accessed through a channel or an outer mutex by
//! whatever owns the connection accept loop.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use arcforge_protocol::PlayerId;
use rand::Rng;

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Tracks every player currently connected or within their reconnect
/// grace period.
///
/// ```text
/// authenticate() ──→ create() ──→ disconnect() ──→ reconnect()
///                       │               │                │
///                       │               ▼                │
///                       │          expire_stale()        │
///                       │               │                │
///                       ▼               ▼                ▼
///                    [Connected]   [Disconnected]   [Connected]
///                                      │
///                                      ▼ (after grace period)
///                                  [Expired] ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    /// All sessions, keyed by player — one session per player at a time.
    sessions: HashMap<PlayerId, Session>,

    /// Reconnection token → player, kept in sync with `sessions`.
    tokens: HashMap<String, PlayerId>,

    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            config,
        }
    }

    /// Creates a session for a player after successful authentication,
    /// generating a fresh reconnection token.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the player already has a
    /// `Connected` session.
    pub fn create(
        &mut self,
        player_id: PlayerId,
    ) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&player_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(player_id));
            }
            // Stale (disconnected/expired) session being replaced —
            // drop its token first so it can't be reconnected-to later.
            self.tokens.remove(&existing.reconnect_token);
        }

        let token = generate_token();

        let session = Session {
            player_id,
            state: SessionState::Connected,
            reconnect_token: token.clone(),
        };

        self.tokens.insert(token, player_id);
        self.sessions.insert(player_id, session);

        tracing::info!(%player_id, "session created");

        Ok(self.sessions.get(&player_id).expect("just inserted"))
    }

    /// Marks a player disconnected, starting their reconnect grace period.
    /// The session itself isn't removed yet.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session exists for this player.
    pub fn disconnect(
        &mut self,
        player_id: PlayerId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };

        tracing::info!(%player_id, "player disconnected, grace period started");
        Ok(())
    }

    /// Resumes a session by reconnect token, transitioning it back to
    /// `Connected` if the grace period hasn't elapsed.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] — token not recognized
    /// - [`SessionError::SessionExpired`] — grace period elapsed
    /// - [`SessionError::AlreadyConnected`] — session was never disconnected
    pub fn reconnect(
        &mut self,
        token: &str,
    ) -> Result<&Session, SessionError> {
        let player_id = self
            .tokens
            .get(token)
            .copied()
            .ok_or(SessionError::InvalidToken)?;

        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidToken)?;

        match &session.state {
            SessionState::Disconnected { since } => {
                let grace =
                    Duration::from_secs(self.config.reconnect_grace_secs);
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    return Err(SessionError::SessionExpired(player_id));
                }
                session.state = SessionState::Connected;
                tracing::info!(%player_id, "player reconnected");
                Ok(self.sessions.get(&player_id).expect("just modified"))
            }
            SessionState::Connected => {
                Err(SessionError::AlreadyConnected(player_id))
            }
            SessionState::Expired => {
                Err(SessionError::SessionExpired(player_id))
            }
        }
    }

    /// Scans every session and expires any `Disconnected` one whose
    /// grace period has elapsed. Intended to run on a periodic tick.
    ///
    /// Returns the player IDs that were just expired.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = Duration::from_secs(self.config.reconnect_grace_secs);
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = &session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    expired.push(session.player_id);
                    tracing::info!(
                        player_id = %session.player_id,
                        "session expired (grace period elapsed)"
                    );
                }
            }
        }

        expired
    }

    /// Drops every `Expired` session (and its token) from the maps.
    /// Separate from [`expire_stale`](Self::expire_stale) so a caller can
    /// react to an expiration (e.g. tell the room the player is gone for
    /// good) before the record disappears.
    pub fn cleanup_expired(&mut self) {
        self.sessions.retain(|_, session| {
            if matches!(session.state, SessionState::Expired) {
                self.tokens.remove(&session.reconnect_token);
                false
            } else {
                true
            }
        });
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Number of sessions tracked, in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// 128 bits of randomness, hex-encoded — used as a reconnection token.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
