use std::fmt;
use serde::{Deserialize, Serialize};

/// Machine-readable failure kind sent alongside the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    PlayerNotInRoom,
    PositionOccupied,
    GameAlreadyFinished,
    NotYourTurn,
    UnknownAction,
    MalformedRequest,
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    RoomNotFound,
    RoomFull,
    PlayerNotInRoom,
    PositionOccupied,
    GameAlreadyFinished,
    NotYourTurn,
    UnknownAction(String),
    MalformedRequest(String),
    Internal,
}

impl GameError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GameError::RoomNotFound => ErrorCode::RoomNotFound,
            GameError::RoomFull => ErrorCode::RoomFull,
            GameError::PlayerNotInRoom => ErrorCode::PlayerNotInRoom,
            GameError::PositionOccupied => ErrorCode::PositionOccupied,
            GameError::GameAlreadyFinished => ErrorCode::GameAlreadyFinished,
            GameError::NotYourTurn => ErrorCode::NotYourTurn,
            GameError::UnknownAction(_) => ErrorCode::UnknownAction,
            GameError::MalformedRequest(_) => ErrorCode::MalformedRequest,
            GameError::Internal => ErrorCode::InternalError,
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        GameError::MalformedRequest(detail.into())
    }
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::RoomNotFound => write!(f, "Room not found"),
            GameError::RoomFull => write!(f, "Room is full"),
            GameError::PlayerNotInRoom => write!(f, "Player not in room"),
            GameError::PositionOccupied => write!(f, "Position already occupied"),
            GameError::GameAlreadyFinished => write!(f, "Game is already finished"),
            GameError::NotYourTurn => write!(f, "Not your turn"),
            GameError::UnknownAction(action) => write!(f, "Unknown message type: {}", action),
            GameError::MalformedRequest(detail) => write!(f, "Invalid message format: {}", detail),
            GameError::Internal => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for GameError {}
