use serde::{Deserialize, Serialize};

use crate::games::tictactoe::{GameState, Mark};
use crate::identifiers::{PlayerId, RoomId};

pub const MAX_PLAYERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub symbol: Mark,
    pub connected: bool,
}

/// Snapshot of a room as sent to clients. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: RoomId,
    pub players: Vec<Player>,
    pub game_state: GameState,
    pub created_at: i64,
    pub last_activity: i64,
}

impl RoomView {
    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }
}

/// Lobby listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub player_count: usize,
    pub game_started: bool,
    pub created_at: i64,
}
