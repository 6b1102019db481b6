//! # Arcforge
//!
//! Low-latency game session server framework for web games.
//!
//! Arcforge provides a server-authoritative architecture where game
//! developers implement a single [`GameInstance`](arcforge_room::GameInstance)
//! trait per game kind and the framework handles transport, sessions,
//! matchmaking, and the tick loop. One server can host several game
//! kinds side by side — each room is an opaque `Box<dyn GameInstance>`
//! behind the [`Coordinator`](arcforge_room::Coordinator).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcforge::prelude::*;
//!
//! # async fn run(auth: impl arcforge_session::Authenticator, kind: GameKind) -> Result<(), ArcforgeError> {
//! let server = ArcforgeServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .register_kind(kind)
//!     .build(auth)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ArcforgeError;
pub use server::{ArcforgeServer, ArcforgeServerBuilder, GameKind, PROTOCOL_VERSION};

/// Re-exports the pieces most callers need to stand up a server: the
/// builder, the protocol and room types, and the traits a game kind or
/// authenticator must implement.
pub mod prelude {
    pub use crate::{ArcforgeError, ArcforgeServer, ArcforgeServerBuilder, GameKind, PROTOCOL_VERSION};
    pub use arcforge_protocol::{
        Action, Channel, Codec, Envelope, GameStatus, JsonCodec, Payload, PlayerId, RoomId,
        SessionEvent, SystemMessage,
    };
    pub use arcforge_room::{
        Broadcaster, CoreError, GameError, GameFactory, GameInstance, GameKindConfig, NpcPolicy,
        NpcSupport, QueuedAction, ServerConfig, ServerConfigBuilder, TurnSupport,
    };
    pub use arcforge_session::{Authenticator, SessionConfig, SessionError};
}
