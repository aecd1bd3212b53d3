mod board;
mod bot_controller;
mod game_state;
mod types;
mod win_detector;

pub use board::{Board, BOARD_CELLS, BOARD_SIDE, CENTER, CORNERS};
pub use bot_controller::{calculate_move, find_winning_move, get_best_move, BotInput, Difficulty};
pub use game_state::{GameState, GameStatus};
pub use types::Mark;
pub use win_detector::{check_winner, is_draw, winning_line, LineKind, Win, WinningLine, WINNING_LINES};
