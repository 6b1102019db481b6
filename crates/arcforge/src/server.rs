//! `ArcforgeServer` builder and server loop.
//!
//! This is the entry point for running an Arcforge game server. It ties
//! together all the layers: transport → protocol → session → room.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use arcforge_protocol::{Channel, Codec, Envelope, JsonCodec, Payload, PlayerId, SessionEvent};
use arcforge_room::{Broadcaster, Coordinator, GameFactory, ServerConfig};
use arcforge_session::{Authenticator, SessionConfig, SessionManager};
use arcforge_transport::{Transport, WebSocketTransport};
use tokio::sync::{mpsc, Mutex};

use crate::handler::handle_connection;
use crate::ArcforgeError;

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Routes outbound [`SessionEvent`]s to the right connection's send
/// queue, encoding them with whatever [`Codec`] the server was built
/// with. This is the [`Broadcaster`] implementation the coordinator and
/// tick driver push through — the room layer never touches a socket
/// directly.
pub(crate) struct ConnectionHub<C: Codec> {
    codec: C,
    senders: StdMutex<HashMap<PlayerId, mpsc::UnboundedSender<Vec<u8>>>>,
    seq: AtomicU64,
}

impl<C: Codec> ConnectionHub<C> {
    fn new(codec: C) -> Self {
        Self {
            codec,
            senders: StdMutex::new(HashMap::new()),
            seq: AtomicU64::new(1),
        }
    }

    pub(crate) fn register(&self, player: PlayerId, sender: mpsc::UnboundedSender<Vec<u8>>) {
        self.senders
            .lock()
            .expect("connection hub mutex poisoned")
            .insert(player, sender);
    }

    pub(crate) fn unregister(&self, player: PlayerId) {
        self.senders
            .lock()
            .expect("connection hub mutex poisoned")
            .remove(&player);
    }
}

impl<C: Codec> Broadcaster for ConnectionHub<C> {
    fn send(&self, player: PlayerId, event: SessionEvent) {
        let sender = self
            .senders
            .lock()
            .expect("connection hub mutex poisoned")
            .get(&player)
            .cloned();
        let Some(sender) = sender else {
            return;
        };
        let envelope = Envelope {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp: 0,
            channel: Channel::ReliableOrdered,
            payload: Payload::Session(event),
        };
        match self.codec.encode(&envelope) {
            Ok(bytes) => {
                // A closed receiver means the connection task already
                // exited; nothing left to do.
                let _ = sender.send(bytes);
            }
            Err(e) => tracing::warn!(%player, error = %e, "failed to encode outbound event"),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
/// Interior mutability via `Mutex` where needed.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) coordinator: Coordinator,
    pub(crate) hub: Arc<ConnectionHub<C>>,
    pub(crate) auth: A,
    pub(crate) codec: C,
}

/// One game kind to register with the coordinator at startup: its
/// limits and its constructor.
pub struct GameKind {
    pub name: String,
    pub config: arcforge_room::GameKindConfig,
    pub factory: GameFactory,
}

/// Builder for configuring and starting an Arcforge server.
///
/// # Example
///
/// ```rust,ignore
/// use arcforge::prelude::*;
///
/// let server = ArcforgeServer::builder()
///     .bind("0.0.0.0:8080")
///     .register_kind(connect_four_kind())
///     .build(my_auth)
///     .await?;
/// server.run().await
/// ```
pub struct ArcforgeServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    server_config: ServerConfig,
    kinds: Vec<GameKind>,
}

impl ArcforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            server_config: ServerConfig::default(),
            kinds: Vec::new(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets server-wide capacity and timing limits.
    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.server_config = config;
        self
    }

    /// Registers a game kind to be hosted by this server.
    pub fn register_kind(mut self, kind: GameKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Builds and starts the server with the given authenticator.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` as defaults (MVP).
    pub async fn build(
        self,
        auth: impl Authenticator,
    ) -> Result<ArcforgeServer<impl Authenticator, JsonCodec>, ArcforgeError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let mut server_config = self.server_config;
        for kind in &self.kinds {
            server_config
                .kinds
                .insert(kind.name.clone(), kind.config.clone());
        }

        let hub = Arc::new(ConnectionHub::new(JsonCodec));
        let coordinator = Coordinator::new(server_config, hub.clone());
        for kind in self.kinds {
            coordinator.register_kind(kind.name, kind.factory);
        }

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            coordinator,
            hub,
            auth,
            codec: JsonCodec,
        });

        Ok(ArcforgeServer { transport, state })
    }
}

impl Default for ArcforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Arcforge game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ArcforgeServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> ArcforgeServer<A, C>
where
    A: Authenticator,
    C: Codec + Clone + 'static,
{
    /// Creates a new builder.
    pub fn builder() -> ArcforgeServerBuilder {
        ArcforgeServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections, performs the handshake, and spawns
    /// a handler task for each connected player. Runs until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), ArcforgeError> {
        tracing::info!("Arcforge server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection::<A, C>(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
