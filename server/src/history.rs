use std::sync::Arc;
use chrono::Utc;
use ringbuffer::{AllocRingBuffer, RingBuffer};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use common::games::tictactoe::{Board, GameState, Mark};
use common::room::RoomView;
use common::RoomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl GameOutcome {
    pub fn from_game_state(state: &GameState) -> Option<Self> {
        match state.winner {
            Some(Mark::X) => Some(GameOutcome::X),
            Some(Mark::O) => Some(GameOutcome::O),
            _ if state.is_draw => Some(GameOutcome::Draw),
            _ => None,
        }
    }
}

/// A finished game as submitted by a client or recorded from a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRecord {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    pub board: Board,
    pub outcome: GameOutcome,
    pub moves: usize,
}

impl NewGameRecord {
    pub fn from_room(room: &RoomView) -> Option<Self> {
        let outcome = GameOutcome::from_game_state(&room.game_state)?;
        Some(Self {
            room_id: Some(room.id.clone()),
            board: room.game_state.board,
            outcome,
            moves: room.game_state.move_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: u64,
    pub room_id: Option<RoomId>,
    pub board: Board,
    pub outcome: GameOutcome,
    pub moves: usize,
    pub timestamp: i64,
}

struct HistoryState {
    records: AllocRingBuffer<GameRecord>,
    next_id: u64,
}

/// Bounded log of finished games; the oldest record is dropped once full.
#[derive(Clone)]
pub struct HistoryStore {
    state: Arc<Mutex<HistoryState>>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").finish()
    }
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HistoryState {
                records: AllocRingBuffer::new(capacity.max(1)),
                next_id: 1,
            })),
        }
    }

    pub async fn save(&self, game: NewGameRecord) -> GameRecord {
        let mut state = self.state.lock().await;
        let record = GameRecord {
            id: state.next_id,
            room_id: game.room_id,
            board: game.board,
            outcome: game.outcome,
            moves: game.moves,
            timestamp: Utc::now().timestamp_millis(),
        };
        state.next_id += 1;
        state.records.enqueue(record.clone());
        record
    }

    /// Oldest first.
    pub async fn list(&self) -> Vec<GameRecord> {
        self.state.lock().await.records.iter().cloned().collect()
    }

    pub async fn get(&self, id: u64) -> Option<GameRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub async fn clear(&self) {
        self.state.lock().await.records.clear();
    }
}
