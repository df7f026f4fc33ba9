use cozy_chess::Board;

pub const STANDARD_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board.
///
/// The remote server reports the standard start as the literal `startpos`,
/// which is accepted here too.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let fen = fen.trim();
    if fen.is_empty() {
        return Err(FenError::Empty);
    }
    if fen == "startpos" {
        return Ok(Board::default());
    }
    if fen.split_whitespace().count() < 4 {
        return Err(FenError::InvalidFormat(fen.to_string()));
    }

    Board::from_fen(fen, false).map_err(|_| FenError::InvalidFormat(fen.to_string()))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Empty FEN")]
    Empty,
    #[error("Invalid FEN: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_alias() {
        let board = parse_fen("startpos").unwrap();
        assert_eq!(format_fen(&board), STANDARD_FEN);
    }

    #[test]
    fn test_round_trip_standard() {
        let board = parse_fen(STANDARD_FEN).unwrap();
        assert_eq!(format_fen(&board), STANDARD_FEN);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_fen("   "), Err(FenError::Empty));
        assert!(matches!(
            parse_fen("not a fen"),
            Err(FenError::InvalidFormat(_))
        ));
    }
}
