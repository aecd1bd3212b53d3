use serde::{Deserialize, Serialize};

use crate::error::GameError;
use super::board::{Board, BOARD_CELLS};
use super::types::Mark;
use super::win_detector::{check_winner, WinningLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    XWon,
    OWon,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Board,
    /// Stays on the last mover once the game is finished.
    pub current_player: Mark,
    pub winner: Option<Mark>,
    pub winning_line: Option<WinningLine>,
    pub is_draw: bool,
    pub move_count: usize,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Mark::X,
            winner: None,
            winning_line: None,
            is_draw: false,
            move_count: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        match (self.winner, self.is_draw) {
            (Some(Mark::X), _) => GameStatus::XWon,
            (Some(Mark::O), _) => GameStatus::OWon,
            (_, true) => GameStatus::Draw,
            _ => GameStatus::InProgress,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some() || self.is_draw
    }

    /// Legality of `mark` playing at `position`, without touching the state.
    pub fn check_move(&self, mark: Mark, position: usize) -> Result<(), GameError> {
        let cell = self.board.get(position).ok_or_else(|| {
            GameError::malformed(format!("position must be between 0 and {}, got {}", BOARD_CELLS - 1, position))
        })?;

        if !cell.is_empty() {
            return Err(GameError::PositionOccupied);
        }

        if self.is_finished() {
            return Err(GameError::GameAlreadyFinished);
        }

        if mark != self.current_player {
            return Err(GameError::NotYourTurn);
        }

        Ok(())
    }

    pub fn place_mark(&mut self, mark: Mark, position: usize) -> Result<(), GameError> {
        self.check_move(mark, position)?;

        self.board.set(position, mark);
        self.move_count += 1;

        if let Some(win) = check_winner(&self.board) {
            self.winner = Some(win.mark);
            self.winning_line = Some(win.line);
        } else if self.move_count == BOARD_CELLS {
            self.is_draw = true;
        } else if let Some(next) = self.current_player.opponent() {
            self.current_player = next;
        }

        Ok(())
    }
}
