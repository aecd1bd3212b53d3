//! JSON messages exchanged with clients.
//!
//! Socket frames are objects tagged by `type` (`CREATE_ROOM`, `MOVE_MADE`, ...).
//! HTTP responses are wrapped in [`ApiResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCode, GameError};
use crate::games::tictactoe::GameState;
use crate::identifiers::PlayerId;
use crate::room::{Player, RoomView};

const CLIENT_MESSAGE_TYPES: &[&str] = &["CREATE_ROOM", "JOIN_ROOM", "MAKE_MOVE", "NEW_GAME", "PING"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom,
    JoinRoom { room_id: String },
    MakeMove { room_id: String, position: i64 },
    NewGame { room_id: String },
    Ping,
}

impl ClientMessage {
    /// Parses a text frame, telling an unknown `type` apart from a broken payload.
    pub fn parse(text: &str) -> Result<Self, GameError> {
        let value: Value = serde_json::from_str(text).map_err(|e| GameError::malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| GameError::malformed("missing message type"))?
            .to_string();

        if !CLIENT_MESSAGE_TYPES.contains(&kind.as_str()) {
            return Err(GameError::UnknownAction(kind));
        }

        serde_json::from_value(value).map_err(|e| GameError::malformed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoined {
    pub player: Player,
    pub room: RoomView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveMade {
    pub player_id: PlayerId,
    pub position: usize,
    pub game_state: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReset {
    pub game_state: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDisconnected {
    pub player_id: PlayerId,
    pub player: Player,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosed {
    pub room_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    RoomCreated { data: RoomView },
    RoomJoined { data: RoomView },
    PlayerJoined { data: PlayerJoined },
    MoveMade { data: MoveMade },
    GameReset { data: GameReset },
    PlayerDisconnected { data: PlayerDisconnected },
    RoomClosed { data: RoomClosed },
    ServerShuttingDown { message: String },
    Pong { timestamp: i64 },
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    pub fn error(error: &GameError) -> Self {
        ServerMessage::Error {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Envelope for every HTTP response: `{success, data?, code?, message?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            code: None,
            message: None,
        }
    }

    pub fn err(error: &GameError) -> Self {
        Self {
            success: false,
            data: None,
            code: Some(error.code()),
            message: Some(error.to_string()),
        }
    }
}
