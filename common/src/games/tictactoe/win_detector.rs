use serde::{Deserialize, Serialize};

use super::board::{Board, BOARD_CELLS};
use super::types::Mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Horizontal,
    Vertical,
    Diagonal,
}

/// One of the eight three-in-a-row lines, with the positional data a client needs to draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningLine {
    pub pattern: [usize; 3],
    #[serde(rename = "type")]
    pub kind: LineKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u8>,
    /// 1 for the main diagonal, 2 for the anti-diagonal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagonal: Option<u8>,
}

const fn row(index: u8) -> WinningLine {
    let start = index as usize * 3;
    WinningLine {
        pattern: [start, start + 1, start + 2],
        kind: LineKind::Horizontal,
        row: Some(index),
        col: None,
        diagonal: None,
    }
}

const fn column(index: u8) -> WinningLine {
    let start = index as usize;
    WinningLine {
        pattern: [start, start + 3, start + 6],
        kind: LineKind::Vertical,
        row: None,
        col: Some(index),
        diagonal: None,
    }
}

const fn diagonal(index: u8, pattern: [usize; 3]) -> WinningLine {
    WinningLine {
        pattern,
        kind: LineKind::Diagonal,
        row: None,
        col: None,
        diagonal: Some(index),
    }
}

/// Scan order: rows, then columns, then both diagonals.
pub const WINNING_LINES: [WinningLine; 8] = [
    row(0),
    row(1),
    row(2),
    column(0),
    column(1),
    column(2),
    diagonal(1, [0, 4, 8]),
    diagonal(2, [2, 4, 6]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Win {
    pub mark: Mark,
    pub line: WinningLine,
}

pub fn check_winner(board: &Board) -> Option<Win> {
    let cells = board.cells();
    WINNING_LINES.iter().find_map(|line| {
        let [a, b, c] = line.pattern;
        let mark = cells[a];
        if !mark.is_empty() && mark == cells[b] && mark == cells[c] {
            Some(Win { mark, line: *line })
        } else {
            None
        }
    })
}

pub fn winning_line(board: &Board) -> Option<WinningLine> {
    check_winner(board).map(|win| win.line)
}

pub fn is_draw(board: &Board, move_count: usize) -> bool {
    move_count == BOARD_CELLS && check_winner(board).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(pattern: &str) -> Board {
        Board::from_pattern(pattern).unwrap()
    }

    #[test]
    fn test_empty_board_has_no_winner() {
        assert_eq!(check_winner(&Board::new()), None);
    }

    #[test]
    fn test_every_line_is_detected_for_both_marks() {
        for line in WINNING_LINES {
            for mark in [Mark::X, Mark::O] {
                let mut cells = [Mark::Empty; BOARD_CELLS];
                for index in line.pattern {
                    cells[index] = mark;
                }

                let win = check_winner(&Board::from_cells(cells)).unwrap();

                assert_eq!(win.mark, mark);
                assert_eq!(win.line, line);
            }
        }
    }

    #[test]
    fn test_winner_iff_some_line_is_uniform() {
        // Every board over {Empty, X, O}: 3^9 cases.
        for code in 0..3usize.pow(9) {
            let mut cells = [Mark::Empty; BOARD_CELLS];
            let mut rest = code;
            for cell in cells.iter_mut() {
                *cell = match rest % 3 {
                    0 => Mark::Empty,
                    1 => Mark::X,
                    _ => Mark::O,
                };
                rest /= 3;
            }
            let has_line = WINNING_LINES.iter().any(|line| {
                let [a, b, c] = line.pattern;
                !cells[a].is_empty() && cells[a] == cells[b] && cells[b] == cells[c]
            });

            assert_eq!(check_winner(&Board::from_cells(cells)).is_some(), has_line);
        }
    }

    #[test]
    fn test_first_line_in_scan_order_is_reported() {
        // Top row and left column both complete.
        let result = check_winner(&board("XXX X-- X--")).unwrap();

        assert_eq!(result.line.pattern, [0, 1, 2]);
        assert_eq!(result.line.kind, LineKind::Horizontal);
        assert_eq!(result.line.row, Some(0));
    }

    #[test]
    fn test_anti_diagonal_metadata() {
        let line = winning_line(&board("--O -O- O--")).unwrap();

        assert_eq!(line.pattern, [2, 4, 6]);
        assert_eq!(line.kind, LineKind::Diagonal);
        assert_eq!(line.diagonal, Some(2));
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        let full = board("XOX XOO OXX");

        assert!(is_draw(&full, 9));
        assert!(!is_draw(&full, 8));
    }

    #[test]
    fn test_full_board_with_line_is_not_draw() {
        assert!(!is_draw(&board("XXX OOX OXO"), 9));
    }

    #[test]
    fn test_winning_line_serializes_like_client_expects() {
        let json = serde_json::to_value(WINNING_LINES[4]).unwrap();

        assert_eq!(json, serde_json::json!({ "pattern": [1, 4, 7], "type": "vertical", "col": 1 }));
    }
}
