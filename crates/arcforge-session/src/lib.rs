//! Player session management for Arcforge.
//!
//! A "session" tracks a connected player independently of which room or
//! game kind they're in — the coordinator asks "is this player still
//! around?" without needing to know anything about matchmaking.
//!
//! - [`Authenticator`] — turns a handshake token into a [`PlayerId`]
//! - [`SessionManager`] — tracks who's connected, disconnected, or
//!   expired, and brokers reconnection via a short-lived token
//!
//! ```text
//! handshake token ──Authenticator──→ PlayerId ──SessionManager::create──→ Session
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::Authenticator;
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
