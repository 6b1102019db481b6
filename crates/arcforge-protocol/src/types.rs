//! Core protocol types for Arcforge's wire format.
//!
//! This module defines every type that travels "on the wire" — meaning these
//! are the structures that get serialized to bytes, sent over the network,
//! and deserialized on the other side.
//!
//! Think of this as the "language" that the client and server speak.

// We import traits and macros from the `serde` crate. Serde is Rust's standard
// library for **ser**ializing and **de**serializing data. The two key traits:
//   - `Serialize`:   "I can be turned INTO bytes/JSON/etc."
//   - `Deserialize`: "I can be created FROM bytes/JSON/etc."
// The `derive` macro auto-generates these implementations for our types.
use serde::{Deserialize, Serialize};
use serde_json::Value;

// We also need `fmt` for implementing Display (human-readable printing).
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// This is a "newtype wrapper" — a common Rust pattern where you wrap a
/// primitive type (here `u64`) in a named struct. Why bother?
///
/// 1. **Type safety**: You can't accidentally pass a `RoomId` where a
///    `PlayerId` is expected, even though both are `u64` underneath.
/// 2. **Readability**: Function signatures like `fn kick(player: PlayerId)`
///    are clearer than `fn kick(player: u64)`.
///
/// The `#[serde(transparent)]` attribute tells serde to serialize this as
/// just the inner `u64`, not as `{ "0": 42 }`. So a PlayerId(42) becomes
/// just `42` in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

/// Display lets us use `{}` in format strings and logging.
/// `tracing::info!("player {} joined", player_id)` will print "player P-42 joined".
impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a room (one game instance).
///
/// Room IDs are dense integers in `[0, max_games)`, handed out by a
/// free-queue-backed pool and reclaimed on cleanup — not a
/// monotonically increasing counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A single unit of player input, opaque to everything except the game
/// kind that receives it.
///
/// Actions travel as JSON so that heterogeneous game kinds can share one
/// wire format without the protocol layer knowing their shape — the same
/// way [`Payload::Game`] used to carry opaque bytes, except actions are
/// small and JSON-shaped rather than pre-encoded by a per-game codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub Value);

impl Action {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

impl From<Value> for Action {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// GameStatus — the result of a tick
// ---------------------------------------------------------------------------

/// The outcome of advancing a game instance by one tick.
///
/// Returned by `GameInstance::tick` in `arcforge-room` and carried over the
/// wire in `end_game` so clients know whether the room is gone for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Normal tick: the game keeps running.
    Active,
    /// The current sub-game ended but the series continues; instance
    /// deactivated and reactivated in place.
    Reset,
    /// The whole series is over. The instance will be cleaned up.
    Done,
    /// The instance isn't active (never started, or already ended).
    Inactive,
}

// ---------------------------------------------------------------------------
// Channel — delivery guarantees
// ---------------------------------------------------------------------------

/// The delivery guarantee for a message.
///
/// Different types of game data need different delivery guarantees.
/// A chat message MUST arrive (reliable), but a position update that's
/// sent 60 times per second can afford to lose a few (unreliable).
///
/// `#[serde(rename_all = "PascalCase")]` makes the JSON representation
/// use PascalCase: `"ReliableOrdered"` instead of `"reliable_ordered"`.
/// This matches the wire protocol spec.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Delivered in order, no loss. Like TCP.
    /// This is the default for most game messages.
    /// The `#[default]` attribute makes this the value returned by
    /// `Channel::default()`.
    #[default]
    ReliableOrdered,

    /// Delivered (no loss), but may arrive out of order.
    /// Good for non-critical reliable data like chat.
    ReliableUnordered,

    /// May be lost, may arrive out of order. Like UDP.
    /// Good for frequent updates (positions, animations) where the
    /// latest value matters more than every value.
    Unreliable,
}

// ---------------------------------------------------------------------------
// SystemMessage — framework-level messages (connection plumbing)
// ---------------------------------------------------------------------------

/// Messages used by the framework itself (not game-specific).
///
/// These handle connection-level plumbing: handshake, heartbeats,
/// graceful disconnects, and generic errors. Room matchmaking and
/// gameplay events live in [`SessionEvent`] instead — they need a
/// session (a `PlayerId`) to mean anything, whereas these fire before
/// one exists or independently of any room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server: "Hello, I want to connect."
    /// `version` is the protocol version so the server can reject
    /// incompatible clients. `token` is an optional auth token.
    Handshake {
        version: u32,
        token: Option<String>,
    },

    /// Server → Client: "Welcome, you're connected."
    /// The server assigns a `player_id` and tells the client the
    /// current `server_time` so they can synchronize clocks.
    HandshakeAck {
        player_id: PlayerId,
        server_time: u64,
    },

    /// Either direction: "I'm disconnecting."
    /// Includes a human-readable reason for logging/debugging.
    Disconnect { reason: String },

    /// Client → Server: "I'm still here."
    /// Sent every ~5 seconds. `client_time` is the client's local
    /// timestamp so the server can echo it back for RTT calculation.
    Heartbeat { client_time: u64 },

    /// Server → Client: "I see you, here's timing info."
    /// The client uses both timestamps to calculate:
    ///   RTT = now - client_time
    ///   clock_offset = server_time - (client_time + RTT/2)
    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    /// Server → Client: "Something went wrong."
    /// `code` follows HTTP-style conventions (400 = bad request,
    /// 401 = unauthorized, 404 = not found, etc.).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// SessionEvent — matchmaking and gameplay events
// ---------------------------------------------------------------------------

/// Session-coordinator events: matchmaking requests from the client and
/// lifecycle/state broadcasts from the server.
///
/// One tagged enum carries both directions, mirroring a Socket.IO-style
/// event channel where inbound and outbound event names share a single
/// namespace. `#[serde(tag = "type")]` keeps the JSON shape flat:
/// `{ "type": "create", "game_kind": "connect_four", "params": {} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // -- Client → Server --
    /// "Make me a new room of this kind."
    Create {
        game_kind: String,
        #[serde(default)]
        params: Value,
    },

    /// "Put me in an existing room of this kind, or make one."
    Join {
        game_kind: String,
        #[serde(default)]
        create_if_not_found: bool,
        #[serde(default)]
        params: Value,
    },

    /// "Take me out of my current room."
    Leave,

    /// "Here's my move."
    Action { action: Action },

    // -- Server → Client --
    /// Room is now active; everyone present gets the full state.
    StartGame {
        spectating: bool,
        start_info: Value,
    },

    /// Still waiting for enough players.
    Waiting { in_game: bool },

    /// Per-tick state snapshot.
    StatePong { state: Value },

    /// Sub-game ended; a new one starts after `timeout_ms`.
    ResetGame {
        state: Value,
        timeout_ms: u64,
        data: Value,
    },

    /// The whole series ended (or the server is forcing every room shut).
    EndGame {
        status: GameStatus,
        data: Value,
    },

    /// Left a room that hadn't become active yet.
    EndLobby,

    /// `create` failed (usually: server at capacity).
    CreationFailed { error: String },

    /// The active room's game kind raised an error; the room is being
    /// torn down.
    GameError { error: String, data: Value },

    /// Something went wrong outside of any specific game's logic.
    ServerError { error: String },
}

// ---------------------------------------------------------------------------
// Payload — what's inside an envelope
// ---------------------------------------------------------------------------

/// The content of a message: either connection plumbing or a session event.
///
/// `#[serde(tag = "type", content = "data")]` produces "adjacently tagged"
/// JSON. For a system message:
///   `{ "type": "System", "data": { "type": "Heartbeat", "client_time": 123 } }`
/// For a session event:
///   `{ "type": "Session", "data": { "type": "create", "game_kind": "..." } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// A framework-level message (handshake, heartbeat).
    System(SystemMessage),

    /// A matchmaking or gameplay event.
    Session(SessionEvent),
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every message on the wire is an Envelope.
///
/// Think of it like a postal envelope: it has metadata on the outside
/// (sequence number, timestamp, delivery method) and the actual content
/// (payload) inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Auto-incrementing sequence number.
    /// Each side (client and server) maintains their own counter.
    /// Used to detect missing or out-of-order messages.
    pub seq: u64,

    /// Milliseconds since the server started.
    /// Used for timing, lag compensation, and debugging.
    pub timestamp: u64,

    /// The delivery guarantee for this message.
    /// Defaults to `ReliableOrdered` if not specified (via `#[serde(default)]`).
    #[serde(default)]
    pub channel: Channel,

    /// The actual message content (system plumbing or a session event).
    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Tests for protocol types and their JSON serialization.
    //!
    //! The wire protocol spec defines exact JSON shapes. These tests
    //! verify that our serde attributes produce the correct format,
    //! because a mismatch means the client SDK can't parse our messages.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // Identity types: PlayerId, RoomId
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        // `#[serde(transparent)]` means PlayerId(42) → `42`, not `{"0":42}`.
        // This matters because the client SDK expects a plain number.
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_deserializes_from_plain_number() {
        let pid: PlayerId = serde_json::from_str("42").unwrap();
        assert_eq!(pid, PlayerId(42));
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&RoomId(99)).unwrap();
        assert_eq!(json, "99");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId(3).to_string(), "R-3");
    }

    // =====================================================================
    // Action
    // =====================================================================

    #[test]
    fn test_action_round_trip_arbitrary_json() {
        let action = Action::new(json!({"column": 3}));
        let bytes = serde_json::to_vec(&action).unwrap();
        let decoded: Action = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(action, decoded);
    }

    #[test]
    fn test_action_serializes_transparently() {
        // #[serde(transparent)] means Action(3) == 3 on the wire, matching
        // the source's "action can just be a bare integer" looseness.
        let action = Action::new(json!(3));
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, "3");
    }

    // =====================================================================
    // GameStatus
    // =====================================================================

    #[test]
    fn test_game_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&GameStatus::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&GameStatus::Reset).unwrap(), "\"reset\"");
        assert_eq!(serde_json::to_string(&GameStatus::Done).unwrap(), "\"done\"");
        assert_eq!(serde_json::to_string(&GameStatus::Inactive).unwrap(), "\"inactive\"");
    }

    // =====================================================================
    // Channel
    // =====================================================================

    #[test]
    fn test_channel_default_is_reliable_ordered() {
        // The wire protocol spec says ReliableOrdered is the default.
        assert_eq!(Channel::default(), Channel::ReliableOrdered);
    }

    #[test]
    fn test_channel_serializes_as_pascal_case() {
        // `#[serde(rename_all = "PascalCase")]` produces "ReliableOrdered",
        // not "reliable_ordered" or "RELIABLE_ORDERED".
        let json = serde_json::to_string(&Channel::ReliableOrdered).unwrap();
        assert_eq!(json, "\"ReliableOrdered\"");

        let json = serde_json::to_string(&Channel::Unreliable).unwrap();
        assert_eq!(json, "\"Unreliable\"");
    }

    // =====================================================================
    // SystemMessage — one test per variant to verify JSON shape
    // =====================================================================

    #[test]
    fn test_system_message_handshake_json_format() {
        // `#[serde(tag = "type")]` produces internally tagged JSON:
        //   { "type": "Handshake", "version": 1, "token": "abc" }
        let msg = SystemMessage::Handshake {
            version: 1,
            token: Some("abc".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Handshake");
        assert_eq!(json["version"], 1);
        assert_eq!(json["token"], "abc");
    }

    #[test]
    fn test_system_message_handshake_without_token() {
        // Token is optional — `None` becomes `null` in JSON.
        let msg = SystemMessage::Handshake {
            version: 1,
            token: None,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Handshake");
        assert!(json["token"].is_null());
    }

    #[test]
    fn test_system_message_handshake_ack_json_format() {
        let msg = SystemMessage::HandshakeAck {
            player_id: PlayerId(42),
            server_time: 15000,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "HandshakeAck");
        assert_eq!(json["player_id"], 42);
        assert_eq!(json["server_time"], 15000);
    }

    #[test]
    fn test_system_message_heartbeat_round_trip() {
        let msg = SystemMessage::Heartbeat { client_time: 5000 };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: SystemMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_system_message_heartbeat_ack_round_trip() {
        let msg = SystemMessage::HeartbeatAck {
            client_time: 5000,
            server_time: 5002,
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: SystemMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_system_message_error_json_format() {
        let msg = SystemMessage::Error {
            code: 401,
            message: "Unauthorized".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 401);
        assert_eq!(json["message"], "Unauthorized");
    }

    #[test]
    fn test_system_message_disconnect_round_trip() {
        let msg = SystemMessage::Disconnect {
            reason: "server shutting down".into(),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: SystemMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    // =====================================================================
    // SessionEvent
    // =====================================================================

    #[test]
    fn test_session_event_create_json_format() {
        let event = SessionEvent::Create {
            game_kind: "connect_four".into(),
            params: json!({"num_games": 2}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "create");
        assert_eq!(json["game_kind"], "connect_four");
        assert_eq!(json["params"]["num_games"], 2);
    }

    #[test]
    fn test_session_event_create_defaults_params_when_missing() {
        let raw = r#"{"type": "create", "game_kind": "connect_four"}"#;
        let event: SessionEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, SessionEvent::Create { params, .. } if params.is_null()));
    }

    #[test]
    fn test_session_event_join_defaults_create_if_not_found_false() {
        let raw = r#"{"type": "join", "game_kind": "connect_four"}"#;
        let event: SessionEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            event,
            SessionEvent::Join { create_if_not_found: false, .. }
        ));
    }

    #[test]
    fn test_session_event_leave_round_trip() {
        let event = SessionEvent::Leave;
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: SessionEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_session_event_action_round_trip() {
        let event = SessionEvent::Action {
            action: Action::new(json!(3)),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: SessionEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_session_event_start_game_json_format() {
        let event = SessionEvent::StartGame {
            spectating: false,
            start_info: json!({"board": []}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "start_game");
        assert_eq!(json["spectating"], false);
    }

    #[test]
    fn test_session_event_waiting_round_trip() {
        let event = SessionEvent::Waiting { in_game: true };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: SessionEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_session_event_reset_game_json_format() {
        let event = SessionEvent::ResetGame {
            state: json!({}),
            timeout_ms: 3000,
            data: json!({}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reset_game");
        assert_eq!(json["timeout_ms"], 3000);
    }

    #[test]
    fn test_session_event_end_game_json_format() {
        let event = SessionEvent::EndGame {
            status: GameStatus::Done,
            data: json!({}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "end_game");
        assert_eq!(json["status"], "done");
    }

    #[test]
    fn test_session_event_end_lobby_round_trip() {
        let event = SessionEvent::EndLobby;
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: SessionEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_session_event_creation_failed_json_format() {
        let event = SessionEvent::CreationFailed {
            error: "server at max capacity".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "creation_failed");
        assert_eq!(json["error"], "server at max capacity");
    }

    #[test]
    fn test_session_event_game_error_json_format() {
        let event = SessionEvent::GameError {
            error: "boom".into(),
            data: json!({}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "game_error");
    }

    // =====================================================================
    // Payload
    // =====================================================================

    #[test]
    fn test_payload_system_json_format() {
        // `#[serde(tag = "type", content = "data")]` produces:
        //   { "type": "System", "data": { ... } }
        let payload = Payload::System(SystemMessage::Disconnect {
            reason: "bye".into(),
        });
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "System");
        assert!(json["data"].is_object());
    }

    #[test]
    fn test_payload_session_json_format() {
        let payload = Payload::Session(SessionEvent::Leave);
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "Session");
        assert_eq!(json["data"]["type"], "leave");
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope {
            seq: 42,
            timestamp: 15000,
            channel: Channel::Unreliable,
            payload: Payload::Session(SessionEvent::Action {
                action: Action::new(json!(1)),
            }),
        };
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_envelope_channel_defaults_when_missing() {
        // `#[serde(default)]` on the channel field means if the JSON
        // doesn't include "channel", it defaults to ReliableOrdered.
        // This is important for backward compatibility.
        let json = r#"{
            "seq": 1,
            "timestamp": 100,
            "payload": { "type": "Session", "data": { "type": "leave" } }
        }"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.channel, Channel::ReliableOrdered);
    }

    // =====================================================================
    // Error cases — malformed input
    // =====================================================================

    #[test]
    fn test_decode_garbage_returns_error() {
        // Random bytes should fail to parse as an Envelope.
        let garbage = b"not json at all";
        let result: Result<Envelope, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_wrong_type_returns_error() {
        // Valid JSON but wrong shape — missing required fields.
        let wrong = r#"{"name": "hello"}"#;
        let result: Result<Envelope, _> = serde_json::from_str(wrong);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_system_message_type_returns_error() {
        // A system message with an unknown "type" tag should fail.
        let unknown = r#"{"type": "FlyToMoon", "speed": 9000}"#;
        let result: Result<SystemMessage, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_session_event_type_returns_error() {
        let unknown = r#"{"type": "teleport"}"#;
        let result: Result<SessionEvent, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
