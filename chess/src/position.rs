use cozy_chess::{Board, Move, Piece, Square};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::types::{PieceKind, Side};

/// Immutable snapshot of a board: placement, side to move, castling and
/// en-passant metadata. Every move produces a new `Position`.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
}

/// Terminal states the rules engine reports on its own.
///
/// `FivefoldRepetition` and `SeventyFiveMoveRule` need the game history, so
/// they are only produced by callers that track positions (see
/// `with_history`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Checkmate { winner: Side },
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoveRule,
    FivefoldRepetition,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Illegal move {from}{to} in {fen}")]
pub struct IllegalMove {
    pub from: Square,
    pub to: Square,
    pub fen: String,
}

/// Plies without a capture or pawn move that draw the game without a claim.
/// cozy-chess caps its own halfmove clock at 100, so callers count these.
pub const SEVENTY_FIVE_MOVE_PLIES: usize = 150;

/// Occurrences of one position that draw the game without a claim.
pub const FIVEFOLD: usize = 5;

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Self {
            board: Board::default(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self {
            board: parse_fen(fen)?,
        })
    }

    pub fn fen(&self) -> String {
        format_fen(&self.board)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Side {
        self.board.side_to_move().into()
    }

    pub fn color_on(&self, square: Square) -> Option<Side> {
        self.board.color_on(square).map(Side::from)
    }

    pub fn piece_on(&self, square: Square) -> Option<PieceKind> {
        self.board.piece_on(square).map(PieceKind::from)
    }

    /// Zobrist hash, used for repetition counting.
    pub fn hash(&self) -> u64 {
        self.board.hash()
    }

    pub fn fullmove_number(&self) -> u16 {
        self.board.fullmove_number()
    }

    /// All legal moves in this position (cozy-chess encoding: castling is
    /// king-takes-own-rook).
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.board.is_legal(mv)
    }

    /// Play `mv` and return the resulting position. `self` is untouched.
    pub fn play(&self, mv: Move) -> Result<Position, IllegalMove> {
        if !self.board.is_legal(mv) {
            return Err(IllegalMove {
                from: mv.from,
                to: mv.to,
                fen: self.fen(),
            });
        }
        let mut board = self.board.clone();
        board.play_unchecked(mv);
        Ok(Self { board })
    }

    pub fn in_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    fn has_moves(&self) -> bool {
        let mut any = false;
        self.board.generate_moves(|_| {
            any = true;
            true
        });
        any
    }

    pub fn is_checkmate(&self) -> bool {
        self.in_check() && !self.has_moves()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.in_check() && !self.has_moves()
    }

    /// Neither side can mate: bare kings, or a single minor piece left.
    pub fn is_insufficient_material(&self) -> bool {
        let board = &self.board;
        let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
        if !heavy.is_empty() {
            return false;
        }
        let minors = board.pieces(Piece::Knight) | board.pieces(Piece::Bishop);
        minors.len() <= 1
    }

    /// Draws the rules engine can detect from this position alone.
    pub fn is_draw(&self) -> bool {
        matches!(
            self.outcome(),
            Some(
                GameOutcome::Stalemate
                    | GameOutcome::InsufficientMaterial
            )
        )
    }

    /// Terminal state of this position, ignoring repetition.
    pub fn outcome(&self) -> Option<GameOutcome> {
        if !self.has_moves() {
            return Some(if self.in_check() {
                GameOutcome::Checkmate {
                    winner: self.side_to_move().opposite(),
                }
            } else {
                GameOutcome::Stalemate
            });
        }
        if self.is_insufficient_material() {
            return Some(GameOutcome::InsufficientMaterial);
        }
        None
    }

    /// Terminal state given how often this position has occurred and how
    /// many plies have passed since the last capture or pawn move. Mate on
    /// the final ply still counts as mate.
    pub fn with_history(&self, occurrences: usize, reversible_plies: usize) -> Option<GameOutcome> {
        match self.outcome() {
            Some(GameOutcome::Checkmate { winner }) => Some(GameOutcome::Checkmate { winner }),
            _ if occurrences >= FIVEFOLD => Some(GameOutcome::FivefoldRepetition),
            _ if reversible_plies >= SEVENTY_FIVE_MOVE_PLIES => {
                Some(GameOutcome::SeventyFiveMoveRule)
            }
            other => other,
        }
    }

    /// Halfmove clock as stored in the board (capped at 100).
    pub fn halfmove_clock(&self) -> u8 {
        self.board.halfmove_clock()
    }

    /// Whether `mv` resets the halfmove clock: a pawn move or a capture.
    pub fn is_zeroing(&self, mv: Move) -> bool {
        self.board.piece_on(mv.from) == Some(Piece::Pawn)
            || self
                .board
                .color_on(mv.to)
                .is_some_and(|color| color != self.board.side_to_move())
    }

    /// Whether `mv` is castling in cozy-chess encoding (king onto own rook).
    pub fn is_castling(&self, mv: Move) -> bool {
        self.board.piece_on(mv.from) == Some(Piece::King)
            && self.board.color_on(mv.to) == self.board.color_on(mv.from)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.fen() == other.fen()
    }
}

impl Eq for Position {}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::parse_uci_move;

    fn play_all(moves: &[&str]) -> Position {
        moves.iter().fold(Position::startpos(), |pos, uci| {
            let mv = parse_uci_move(&pos, uci).unwrap();
            pos.play(mv).unwrap()
        })
    }

    #[test]
    fn test_play_returns_new_position() {
        let start = Position::startpos();
        let mv = parse_uci_move(&start, "e2e4").unwrap();
        let next = start.play(mv).unwrap();
        assert_eq!(start, Position::startpos());
        assert_eq!(next.side_to_move(), Side::Black);
    }

    #[test]
    fn test_illegal_move_rejected() {
        let start = Position::startpos();
        let mv = Move {
            from: Square::E2,
            to: Square::E5,
            promotion: None,
        };
        assert!(start.play(mv).is_err());
        assert!(!start.is_legal(mv));
    }

    #[test]
    fn test_scholars_mate_is_checkmate() {
        let pos = play_all(&["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6", "h5f7"]);
        assert!(pos.is_checkmate());
        assert_eq!(
            pos.outcome(),
            Some(GameOutcome::Checkmate {
                winner: Side::White
            })
        );
    }

    #[test]
    fn test_stalemate() {
        let pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(pos.is_stalemate());
        assert!(pos.is_draw());
    }

    #[test]
    fn test_insufficient_material() {
        let pos = Position::from_fen("8/8/4k3/8/8/3NK3/8/8 w - - 0 1").unwrap();
        assert_eq!(pos.outcome(), Some(GameOutcome::InsufficientMaterial));
        let pos = Position::from_fen("8/8/4k3/8/8/3RK3/8/8 w - - 0 1").unwrap();
        assert_eq!(pos.outcome(), None);
    }

    #[test]
    fn test_history_outcomes() {
        let pos = Position::startpos();
        assert_eq!(pos.with_history(4, 0), None);
        assert_eq!(
            pos.with_history(5, 0),
            Some(GameOutcome::FivefoldRepetition)
        );
        assert_eq!(pos.with_history(1, 149), None);
        assert_eq!(
            pos.with_history(1, 150),
            Some(GameOutcome::SeventyFiveMoveRule)
        );
    }

    #[test]
    fn test_full_board_clock_is_not_terminal() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 100 80").unwrap();
        assert_eq!(pos.halfmove_clock(), 100);
        assert_eq!(pos.outcome(), None);
        assert!(!pos.is_draw());
    }

    #[test]
    fn test_zeroing_moves() {
        let pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/R3K3 w - - 0 1").unwrap();
        assert!(pos.is_zeroing(parse_uci_move(&pos, "e4e5").unwrap()));
        assert!(pos.is_zeroing(parse_uci_move(&pos, "e4d5").unwrap()));
        assert!(!pos.is_zeroing(parse_uci_move(&pos, "a1a7").unwrap()));
        let castle = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        assert!(!castle.is_zeroing(parse_uci_move(&castle, "e1g1").unwrap()));
    }

    #[test]
    fn test_castling_detection() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castle = parse_uci_move(&pos, "e1g1").unwrap();
        assert!(pos.is_castling(castle));
        let rook_move = parse_uci_move(&pos, "h1h5").unwrap();
        assert!(!pos.is_castling(rook_move));
    }
}
