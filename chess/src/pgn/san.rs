use cozy_chess::Move;

use crate::position::Position;
use crate::types::PieceKind;
use crate::uci::format_square;

/// Parse Standard Algebraic Notation (SAN) move against the legal moves of
/// `position`. Check, mate and capture markers are optional.
pub fn parse_san(position: &Position, san: &str) -> Result<Move, SanError> {
    let trimmed = san.trim().trim_end_matches(['+', '#', '!', '?']);
    if trimmed.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = position.legal_moves();

    if let Some(kingside) = castling_side(trimmed) {
        return legal
            .into_iter()
            .find(|mv| {
                position.is_castling(*mv) && (mv.to.file() as u8 > mv.from.file() as u8) == kingside
            })
            .ok_or_else(|| SanError::NoLegalMove(san.to_string()));
    }

    let wanted = normalize(trimmed);
    let exact: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|mv| normalize(&format_san(position, *mv)) == wanted)
        .collect();
    if let [mv] = exact.as_slice() {
        return Ok(*mv);
    }

    // Over-disambiguated input such as "Ngf3" or "Ng1f3".
    let loose: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|mv| long_forms(position, *mv).iter().any(|form| *form == wanted))
        .collect();
    match loose.as_slice() {
        [mv] => Ok(*mv),
        [] => Err(SanError::NoLegalMove(san.to_string())),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

fn castling_side(s: &str) -> Option<bool> {
    match s {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, 'x' | '+' | '#' | '=' | '!' | '?'))
        .collect()
}

fn long_forms(position: &Position, mv: Move) -> Vec<String> {
    let letter = position
        .piece_on(mv.from)
        .and_then(PieceKind::san_letter)
        .map(String::from)
        .unwrap_or_default();
    let from = format_square(mv.from);
    let to = format_square(mv.to);
    let promo = promotion_suffix(mv);
    vec![
        format!("{}{}{}{}", letter, from, to, promo),
        format!("{}{}{}{}", letter, &from[0..1], to, promo),
        format!("{}{}{}{}", letter, &from[1..2], to, promo),
    ]
}

fn promotion_suffix(mv: Move) -> String {
    mv.promotion
        .and_then(|p| PieceKind::from(p).san_letter())
        .map(String::from)
        .unwrap_or_default()
}

/// Format a legal move as SAN, including disambiguation and check markers.
pub fn format_san(position: &Position, mv: Move) -> String {
    let mut san = String::new();

    if position.is_castling(mv) {
        san.push_str(if mv.to.file() as u8 > mv.from.file() as u8 {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        let piece = position.piece_on(mv.from).unwrap_or(PieceKind::Pawn);
        let is_capture = position.color_on(mv.to).is_some()
            || (piece == PieceKind::Pawn && mv.from.file() != mv.to.file());
        let from = format_square(mv.from);

        match piece.san_letter() {
            Some(letter) => {
                san.push(letter);
                san.push_str(&disambiguation(position, mv, piece, &from));
            }
            None if is_capture => san.push_str(&from[0..1]),
            None => {}
        }

        if is_capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));

        let promo = promotion_suffix(mv);
        if !promo.is_empty() {
            san.push('=');
            san.push_str(&promo);
        }
    }

    if let Ok(after) = position.play(mv) {
        if after.is_checkmate() {
            san.push('#');
        } else if after.in_check() {
            san.push('+');
        }
    }

    san
}

fn disambiguation(position: &Position, mv: Move, piece: PieceKind, from: &str) -> String {
    let rivals: Vec<String> = position
        .legal_moves()
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && position.piece_on(other.from) == Some(piece)
        })
        .map(|other| format_square(other.from))
        .collect();

    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|r| r[0..1] != from[0..1]) {
        from[0..1].to_string()
    } else if rivals.iter().all(|r| r[1..2] != from[1..2]) {
        from[1..2].to_string()
    } else {
        from.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::{parse_uci_move, to_uci};
    use proptest::prelude::*;

    fn after(moves: &[&str]) -> Position {
        moves.iter().fold(Position::startpos(), |pos, uci| {
            let mv = parse_uci_move(&pos, uci).unwrap();
            pos.play(mv).unwrap()
        })
    }

    #[test]
    fn test_format_basic_moves() {
        let pos = Position::startpos();
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "e2e4").unwrap()), "e4");
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "g1f3").unwrap()), "Nf3");
    }

    #[test]
    fn test_format_capture_and_check() {
        let pos = after(&["e2e4", "d7d5"]);
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "e4d5").unwrap()), "exd5");
        let pos = after(&["e2e4", "f7f6", "d2d4", "g7g5"]);
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "d1h5").unwrap()), "Qh5#");
    }

    #[test]
    fn test_format_disambiguation() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1").unwrap();
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "b1d2").unwrap()), "Nbd2");
    }

    #[test]
    fn test_format_castling_and_promotion() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "e1g1").unwrap()), "O-O");
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "e1c1").unwrap()), "O-O-O");

        let pos = Position::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        assert_eq!(format_san(&pos, parse_uci_move(&pos, "e7e8q").unwrap()), "e8=Q");
    }

    #[test]
    fn test_parse_san_matches_legal_move() {
        let pos = Position::startpos();
        assert_eq!(parse_san(&pos, "Nf3").unwrap(), parse_uci_move(&pos, "g1f3").unwrap());
        assert_eq!(parse_san(&pos, "e4").unwrap(), parse_uci_move(&pos, "e2e4").unwrap());
        assert_eq!(parse_san(&pos, "Ng1f3").unwrap(), parse_uci_move(&pos, "g1f3").unwrap());
    }

    #[test]
    fn test_parse_san_castling() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(parse_san(&pos, "O-O").unwrap(), parse_uci_move(&pos, "e1g1").unwrap());
        assert_eq!(parse_san(&pos, "O-O-O+").unwrap(), parse_uci_move(&pos, "e1c1").unwrap());
    }

    #[test]
    fn test_parse_san_errors() {
        let pos = Position::startpos();
        assert!(matches!(parse_san(&pos, "Qh5"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&pos, ""), Err(SanError::InvalidFormat(_))));
    }

    proptest! {
        /// Along any random game, every legal move survives formatting and
        /// re-parsing in both SAN and standard UCI.
        #[test]
        fn prop_notation_round_trips(choices in prop::collection::vec(any::<prop::sample::Index>(), 0..60)) {
            let mut pos = Position::startpos();
            for choice in &choices {
                let legal = pos.legal_moves();
                if legal.is_empty() {
                    break;
                }
                for &mv in &legal {
                    prop_assert_eq!(parse_san(&pos, &format_san(&pos, mv)).unwrap(), mv);
                    prop_assert_eq!(parse_uci_move(&pos, &to_uci(&pos, mv)).unwrap(), mv);
                }
                pos = pos.play(legal[choice.index(legal.len())]).unwrap();
            }
        }
    }
}
