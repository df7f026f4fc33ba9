//! Rules-engine layer over cozy-chess: immutable positions, terminal
//! outcomes, and the notations (FEN, UCI, SAN, PGN) the rest of the
//! workspace speaks.

pub mod board_display;
pub mod fen;
pub mod pgn;
pub mod position;
pub mod types;
pub mod uci;

pub use board_display::DisplayBoard;
pub use cozy_chess::{Move, Square};
pub use fen::{FenError, STANDARD_FEN};
pub use pgn::{format_san, parse_pgn, parse_san, PgnError, PgnGame, SanError};
pub use position::{GameOutcome, IllegalMove, Position, FIVEFOLD, SEVENTY_FIVE_MOVE_PLIES};
pub use types::{PieceKind, Side};
pub use uci::{format_square, parse_square, parse_uci_move, to_uci, UciError};
