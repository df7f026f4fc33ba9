//! Move Gate: decides whether a proposed move is accepted.
//!
//! Evaluation is a pure query. Applying an accepted move is left to the
//! session state, which owns the store and the cursor.

use chess::{Move, Position};

use crate::mode::ModeController;

/// What must happen after an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    None,
    ForwardToBot,
    AdvancePuzzle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Accepted(FollowUp),
    RejectedIllegal,
    RejectedNotAllowed,
    RejectedWrongTurn,
}

impl MoveOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Run the gate checks for `mv` against `position`.
///
/// Idle and finished sessions refuse everything. Otherwise the order is:
/// own piece on the origin square, rules-engine legality, then the mode's
/// allowed move set.
pub fn evaluate(controller: &ModeController, position: &Position, mv: Move) -> MoveOutcome {
    if controller.is_idle() || controller.is_over() {
        return MoveOutcome::RejectedNotAllowed;
    }
    if position.color_on(mv.from) != Some(position.side_to_move()) {
        return MoveOutcome::RejectedWrongTurn;
    }
    if !position.is_legal(mv) {
        return MoveOutcome::RejectedIllegal;
    }
    if !controller.allowed_moves(position).permits(mv) {
        return MoveOutcome::RejectedNotAllowed;
    }
    MoveOutcome::Accepted(controller.follow_up())
}
