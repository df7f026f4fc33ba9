use chess::Side;

use crate::mode::GameOverReason;
use crate::snapshot::SessionSnapshot;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    /// Full state snapshot after any mutation.
    StateChanged(SessionSnapshot),
    /// Discrete notification for the presentation layer.
    Notification(Notification),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A legal move that is not the puzzle solution; nothing was applied.
    WrongMove { solved_index: usize },
    GameOver { reason: GameOverReason },
    Error { message: String },
    /// Side the local player controls, for board orientation.
    Orientation { local: Side },
}
