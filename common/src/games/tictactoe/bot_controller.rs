use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::games::SessionRng;
use super::board::{Board, CENTER, CORNERS};
use super::types::Mark;
use super::win_detector::{check_winner, WINNING_LINES};

const WIN_SCORE: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

impl Difficulty {
    /// Lenient parse used for client input: unknown tiers play as medium.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

pub struct BotInput {
    pub board: Board,
    pub bot_mark: Mark,
}

impl BotInput {
    /// The bot plays whichever side is to move: X when both sides have
    /// placed the same number of marks, O otherwise.
    pub fn from_board(board: Board) -> Self {
        let bot_mark = if board.count(Mark::X) > board.count(Mark::O) {
            Mark::O
        } else {
            Mark::X
        };
        Self { board, bot_mark }
    }
}

pub fn get_best_move(board: &Board, difficulty: Difficulty, rng: &mut SessionRng) -> Option<usize> {
    calculate_move(difficulty, &BotInput::from_board(*board), rng)
}

pub fn calculate_move(difficulty: Difficulty, input: &BotInput, rng: &mut SessionRng) -> Option<usize> {
    let available_moves = input.board.available_moves();
    if available_moves.is_empty() {
        return None;
    }

    match difficulty {
        Difficulty::Easy => rng.choose(&available_moves),
        Difficulty::Medium => calculate_heuristic_move(input, &available_moves, rng),
        Difficulty::Hard => calculate_minimax_move(input),
    }
}

fn calculate_heuristic_move(input: &BotInput, available_moves: &[usize], rng: &mut SessionRng) -> Option<usize> {
    if let Some(position) = find_winning_move(&input.board, input.bot_mark) {
        return Some(position);
    }

    if let Some(opponent) = input.bot_mark.opponent()
        && let Some(position) = find_winning_move(&input.board, opponent)
    {
        return Some(position);
    }

    if available_moves.contains(&CENTER) {
        return Some(CENTER);
    }

    let open_corners: Vec<usize> = CORNERS
        .into_iter()
        .filter(|corner| available_moves.contains(corner))
        .collect();
    if let Some(corner) = rng.choose(&open_corners) {
        return Some(corner);
    }

    rng.choose(available_moves)
}

/// First empty cell that completes a line already holding two of `mark`.
pub fn find_winning_move(board: &Board, mark: Mark) -> Option<usize> {
    let cells = board.cells();
    WINNING_LINES.iter().find_map(|line| {
        let own = line.pattern.iter().filter(|&&i| cells[i] == mark).count();
        let empty = line.pattern.iter().filter(|&&i| cells[i].is_empty()).count();
        if own == 2 && empty == 1 {
            line.pattern.iter().copied().find(|&i| cells[i].is_empty())
        } else {
            None
        }
    })
}

fn calculate_minimax_move(input: &BotInput) -> Option<usize> {
    let opponent_mark = input.bot_mark.opponent()?;
    let mut board = input.board;

    let mut best_move = None;
    let mut best_score = i32::MIN;

    for position in board.available_moves() {
        board.set(position, input.bot_mark);
        let score = minimax(&mut board, 1, false, input.bot_mark, opponent_mark);
        board.set(position, Mark::Empty);

        if score > best_score {
            best_score = score;
            best_move = Some(position);
        }
    }

    best_move
}

/// Full-depth search; `depth` counts plies below the board the bot was asked about.
fn minimax(board: &mut Board, depth: i32, is_maximizing: bool, bot_mark: Mark, opponent_mark: Mark) -> i32 {
    if let Some(win) = check_winner(board) {
        return if win.mark == bot_mark {
            WIN_SCORE - depth
        } else {
            depth - WIN_SCORE
        };
    }

    if board.is_full() {
        return 0;
    }

    let (mover, mut best) = if is_maximizing {
        (bot_mark, i32::MIN)
    } else {
        (opponent_mark, i32::MAX)
    };

    for position in board.available_moves() {
        board.set(position, mover);
        let score = minimax(board, depth + 1, !is_maximizing, bot_mark, opponent_mark);
        board.set(position, Mark::Empty);

        best = if is_maximizing { best.max(score) } else { best.min(score) };
    }

    best
}
