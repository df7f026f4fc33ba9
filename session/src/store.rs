//! Position Store: the canonical position history of a session.

use chess::{format_san, to_uci, GameOutcome, IllegalMove, Move, Position, Side};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    IllegalMove(#[from] IllegalMove),

    #[error("Position index {index} out of range (history length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// One played ply. Only the store builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    mv: Move,
    uci: String,
    san: String,
    side: Side,
    position_index: usize,
    zeroing: bool,
}

impl MoveRecord {
    /// The move in cozy-chess encoding (castling as king-takes-rook).
    pub fn mv(&self) -> Move {
        self.mv
    }

    /// Standard UCI text, as the remote server spells it.
    pub fn uci(&self) -> &str {
        &self.uci
    }

    pub fn san(&self) -> &str {
        &self.san
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Index of the position this move produced.
    pub fn position_index(&self) -> usize {
        self.position_index
    }
}

/// Ordered position history. Index 0 is the start position, and position
/// `i + 1` is position `i` with `moves[i]` played.
#[derive(Debug, Clone)]
pub struct PositionStore {
    start: Position,
    after: Vec<Position>,
    moves: Vec<MoveRecord>,
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new(Position::startpos())
    }
}

impl PositionStore {
    pub fn new(start: Position) -> Self {
        Self {
            start,
            after: Vec::new(),
            moves: Vec::new(),
        }
    }

    /// Clear history down to a single starting position.
    pub fn reset(&mut self, start: Position) {
        self.start = start;
        self.after.clear();
        self.moves.clear();
    }

    /// Play `mv` on the tip and append the result.
    pub fn apply(&mut self, mv: Move) -> Result<&Position, StoreError> {
        let tip = self.tip();
        let next = tip.play(mv)?;
        let record = MoveRecord {
            mv,
            uci: to_uci(tip, mv),
            san: format_san(tip, mv),
            side: tip.side_to_move(),
            position_index: self.after.len() + 1,
            zeroing: tip.is_zeroing(mv),
        };
        tracing::debug!(uci = %record.uci, san = %record.san, "Move applied");
        self.moves.push(record);
        self.after.push(next);
        Ok(self.tip())
    }

    pub fn position_at(&self, index: usize) -> Result<&Position, StoreError> {
        match index {
            0 => Ok(&self.start),
            i => self.after.get(i - 1).ok_or(StoreError::IndexOutOfRange {
                index,
                len: self.len(),
            }),
        }
    }

    pub fn tip(&self) -> &Position {
        self.after.last().unwrap_or(&self.start)
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    /// Number of positions, including the start.
    pub fn len(&self) -> usize {
        self.after.len() + 1
    }

    /// True when no move has been played yet.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn uci_moves(&self) -> Vec<&str> {
        self.moves.iter().map(MoveRecord::uci).collect()
    }

    /// Drop every move after the first `plies`.
    pub fn truncate(&mut self, plies: usize) {
        self.moves.truncate(plies);
        self.after.truncate(plies);
    }

    /// Take back the last ply.
    pub fn pop(&mut self) -> Option<MoveRecord> {
        self.after.pop();
        self.moves.pop()
    }

    /// How often the tip position has occurred in this history.
    pub fn repetition_count(&self) -> usize {
        let tip = self.tip().hash();
        std::iter::once(&self.start)
            .chain(&self.after)
            .filter(|p| p.hash() == tip)
            .count()
    }

    /// Plies since the last capture or pawn move. Seeded from the start
    /// position's halfmove clock when no such move was played here.
    pub fn reversible_plies(&self) -> usize {
        let quiet = self
            .moves
            .iter()
            .rev()
            .take_while(|record| !record.zeroing)
            .count();
        if quiet == self.moves.len() {
            usize::from(self.start.halfmove_clock()) + quiet
        } else {
            quiet
        }
    }

    /// Terminal state of the tip, repetition and the 75-move rule included.
    pub fn outcome(&self) -> Option<GameOutcome> {
        self.tip()
            .with_history(self.repetition_count(), self.reversible_plies())
    }
}
