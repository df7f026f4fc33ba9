//! UCI (Universal Chess Interface) move notation.
//!
//! The remote server speaks standard UCI, where castling is the king moving
//! two squares (`e1g1`). cozy-chess encodes castling as king-takes-own-rook
//! (`e1h1`), so both directions are converted against a concrete position.

use cozy_chess::{File, Move, Piece, Rank, Square};

use crate::position::Position;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Invalid UCI move: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(char),
}

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// Only converts when the converted move is actually legal, so a plain king
/// step onto g1 in some odd position is left alone.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_file = match mv.to.file() {
            File::G => File::H,
            _ => File::A,
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };

        if legal_moves.contains(&converted) && !legal_moves.contains(&mv) {
            return converted;
        }
    }

    mv
}

/// Parse a square name such as `e4`.
pub fn parse_square(s: &str) -> Result<Square, UciError> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return Err(UciError::InvalidSquare(s.to_string()));
    }
    let file = bytes[0].wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    if file > 7 || rank > 7 {
        return Err(UciError::InvalidSquare(s.to_string()));
    }
    Ok(Square::new(
        File::index(file as usize),
        Rank::index(rank as usize),
    ))
}

pub fn format_square(square: Square) -> String {
    let file = (b'a' + square.file() as u8) as char;
    let rank = (b'1' + square.rank() as u8) as char;
    format!("{}{}", file, rank)
}

fn parse_promotion(c: char) -> Result<Piece, UciError> {
    match c.to_ascii_lowercase() {
        'n' => Ok(Piece::Knight),
        'b' => Ok(Piece::Bishop),
        'r' => Ok(Piece::Rook),
        'q' => Ok(Piece::Queen),
        other => Err(UciError::InvalidPromotion(other)),
    }
}

fn promotion_char(piece: Piece) -> char {
    match piece {
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::King => 'k',
        Piece::Pawn => 'p',
        Piece::Queen => 'q',
    }
}

/// Parse raw UCI text without consulting a position. Castling stays in
/// standard notation.
pub fn parse_raw_uci(s: &str) -> Result<Move, UciError> {
    let s = s.trim();
    if !(4..=5).contains(&s.len()) || !s.is_ascii() {
        return Err(UciError::InvalidFormat(s.to_string()));
    }
    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;
    let promotion = match s[4..].chars().next() {
        Some(c) => Some(parse_promotion(c)?),
        None => None,
    };
    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Parse a UCI move for `position`, converting castling to cozy-chess form.
/// Legality is not checked here.
pub fn parse_uci_move(position: &Position, s: &str) -> Result<Move, UciError> {
    let mv = parse_raw_uci(s)?;
    Ok(convert_uci_castling_to_cozy(mv, &position.legal_moves()))
}

/// Format a move in UCI notation without castling conversion (e.g. "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(promotion_char(promo));
    }
    s
}

/// Format a move played in `position` in standard UCI (castling as the king
/// moving two squares).
pub fn to_uci(position: &Position, mv: Move) -> String {
    if position.is_castling(mv) {
        let king_file = if mv.to.file() as u8 > mv.from.file() as u8 {
            File::G
        } else {
            File::C
        };
        let standard = Move {
            from: mv.from,
            to: Square::new(king_file, mv.from.rank()),
            promotion: None,
        };
        return format_uci_move(standard);
    }
    format_uci_move(mv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_square_bounds() {
        assert_eq!(parse_square("a1").unwrap(), Square::A1);
        assert_eq!(parse_square("h8").unwrap(), Square::H8);
        assert!(parse_square("i1").is_err());
        assert!(parse_square("a9").is_err());
        assert!(parse_square("a").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_text() {
        assert!(parse_raw_uci("e2").is_err());
        assert!(parse_raw_uci("e2e4x").is_err());
        assert!(parse_raw_uci("e7e8k").is_err());
    }

    #[test]
    fn test_castling_round_trip() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let short = parse_uci_move(&pos, "e1g1").unwrap();
        assert_eq!(short.to, Square::H1);
        assert_eq!(to_uci(&pos, short), "e1g1");

        let long = parse_uci_move(&pos, "e1c1").unwrap();
        assert_eq!(long.to, Square::A1);
        assert_eq!(to_uci(&pos, long), "e1c1");
    }

    #[test]
    fn test_king_step_to_g_file_is_not_castling() {
        // King on e1 without castling rights: e1f1 style steps stay untouched
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mv = parse_uci_move(&pos, "e1f1").unwrap();
        assert_eq!(mv.to, Square::F1);
        assert_eq!(to_uci(&pos, mv), "e1f1");
    }
}
