use serde::{Deserialize, Serialize};

use super::types::Mark;

pub const BOARD_SIDE: usize = 3;
pub const BOARD_CELLS: usize = BOARD_SIDE * BOARD_SIDE;
pub const CENTER: usize = 4;
pub const CORNERS: [usize; 4] = [0, 2, 6, 8];

/// 3x3 grid stored row-major: index = row * 3 + column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Mark; BOARD_CELLS]);

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Mark; BOARD_CELLS]) -> Self {
        Self(cells)
    }

    /// Builds a board from a 9-character picture such as `"XO-XO----"`; any
    /// character other than `X`/`O` is an empty cell.
    pub fn from_pattern(pattern: &str) -> Option<Self> {
        let chars: Vec<char> = pattern.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.len() != BOARD_CELLS {
            return None;
        }
        let mut cells = [Mark::Empty; BOARD_CELLS];
        for (cell, ch) in cells.iter_mut().zip(chars) {
            *cell = match ch.to_ascii_uppercase() {
                'X' => Mark::X,
                'O' => Mark::O,
                _ => Mark::Empty,
            };
        }
        Some(Self(cells))
    }

    pub fn get(&self, position: usize) -> Option<Mark> {
        self.0.get(position).copied()
    }

    pub(crate) fn set(&mut self, position: usize, mark: Mark) {
        self.0[position] = mark;
    }

    pub fn cells(&self) -> &[Mark; BOARD_CELLS] {
        &self.0
    }

    pub fn available_moves(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.0.iter().filter(|&&cell| cell == mark).count()
    }

    pub fn filled_count(&self) -> usize {
        BOARD_CELLS - self.count(Mark::Empty)
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(|cell| !cell.is_empty())
    }
}
