use chess::Side;

use crate::mode::{AllowedMoveSet, SessionMode, SessionPhase};
use crate::timer::ClockSnapshot;

/// Complete, immutable snapshot of session state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub mode: SessionMode,
    pub phase: SessionPhase,
    pub tip_fen: String,
    /// Position under the navigation cursor.
    pub displayed_fen: String,
    pub displayed_side_to_move: Side,
    pub cursor: usize,
    pub ply_count: usize,
    pub history: Vec<HistoryEntry>,
    /// Moves (standard UCI) the gate would accept on the displayed board.
    /// Empty while reviewing a position the gate does not evaluate.
    pub playable_moves: Vec<String>,
    pub allowed: AllowedMoveSet,
    pub clock: Option<ClockSnapshot>,
    pub local_color: Option<Side>,
    pub can_advance_puzzle: bool,
}

/// A single move in the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub uci: String,
    pub san: String,
    pub side: Side,
}

impl SessionSnapshot {
    pub fn is_over(&self) -> bool {
        matches!(self.phase, SessionPhase::Over(_))
    }

    /// Solved index of the loaded puzzle, if any.
    pub fn solved_index(&self) -> Option<usize> {
        match &self.mode {
            SessionMode::PuzzleSolving(progress) => Some(progress.solved_index),
            _ => None,
        }
    }

    /// Move list as numbered SAN text, e.g. `1. e4 e5 2. Nf3`.
    pub fn history_text(&self, first_move_number: u16) -> String {
        let mut out = String::new();
        let mut number = first_move_number;
        for (i, entry) in self.history.iter().enumerate() {
            match entry.side {
                Side::White => {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&format!("{}. {}", number, entry.san));
                }
                Side::Black => {
                    if i == 0 {
                        out.push_str(&format!("{}... {}", number, entry.san));
                    } else {
                        out.push(' ');
                        out.push_str(&entry.san);
                    }
                    number += 1;
                }
            }
        }
        out
    }
}
