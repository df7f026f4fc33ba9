//! Plain-text board rendering for terminal front ends.

use cozy_chess::{File, Rank, Square};

use crate::position::Position;
use crate::types::{PieceKind, Side};

/// An 8x8 board for display purposes only.
#[derive(Debug, Clone, Default)]
pub struct DisplayBoard {
    squares: [[Option<(PieceKind, Side)>; 8]; 8],
}

impl DisplayBoard {
    pub fn from_position(position: &Position) -> Self {
        let mut squares = [[None; 8]; 8];
        for (rank_idx, row) in squares.iter_mut().enumerate() {
            for (file_idx, cell) in row.iter_mut().enumerate() {
                let square = Square::new(File::index(file_idx), Rank::index(rank_idx));
                *cell = position.piece_on(square).zip(position.color_on(square));
            }
        }
        Self { squares }
    }

    pub fn piece_at(&self, file: u8, rank: u8) -> Option<(PieceKind, Side)> {
        if file > 7 || rank > 7 {
            return None;
        }
        self.squares[rank as usize][file as usize]
    }

    /// Render with `orientation` at the bottom of the board.
    pub fn render(&self, orientation: Side) -> String {
        let ranks: Vec<u8> = match orientation {
            Side::White => (0..8).rev().collect(),
            Side::Black => (0..8).collect(),
        };
        let files: Vec<u8> = match orientation {
            Side::White => (0..8).collect(),
            Side::Black => (0..8).rev().collect(),
        };

        let mut out = String::new();
        for &rank in &ranks {
            out.push((b'1' + rank) as char);
            out.push(' ');
            for &file in &files {
                let symbol = self
                    .piece_at(file, rank)
                    .map(|(kind, side)| kind.symbol(side))
                    .unwrap_or('.');
                out.push(' ');
                out.push(symbol);
            }
            out.push('\n');
        }
        out.push_str("  ");
        for &file in &files {
            out.push(' ');
            out.push((b'a' + file) as char);
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position() {
        let board = DisplayBoard::from_position(&Position::startpos());
        assert_eq!(board.piece_at(0, 0), Some((PieceKind::Rook, Side::White)));
        assert_eq!(board.piece_at(4, 0), Some((PieceKind::King, Side::White)));
        assert_eq!(board.piece_at(3, 7), Some((PieceKind::Queen, Side::Black)));
        assert_eq!(board.piece_at(4, 4), None);
    }

    #[test]
    fn test_render_orientation() {
        let board = DisplayBoard::from_position(&Position::startpos());
        let white = board.render(Side::White);
        assert!(white.starts_with("8  r n b q k b n r"));
        assert!(white.ends_with("   a b c d e f g h\n"));

        let black = board.render(Side::Black);
        assert!(black.starts_with("1  R N B K Q B N R"));
        assert!(black.ends_with("   h g f e d c b a\n"));
    }
}
