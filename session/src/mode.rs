//! Session Mode Controller: which inputs are valid, which moves the gate
//! accepts, and when a session is over.

use std::fmt;

use chess::{GameOutcome, Move, Position, Side};
use smallvec::SmallVec;

use crate::gate::FollowUp;

/// Progress through a loaded puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleProgress {
    pub id: String,
    pub rating: u32,
    /// Solution in cozy-chess encoding, each legal after the previous one.
    pub solution: Vec<Move>,
    pub solution_uci: Vec<String>,
    pub solved_index: usize,
    pub failed: bool,
}

impl PuzzleProgress {
    pub fn is_solved(&self) -> bool {
        self.solved_index == self.solution.len()
    }

    /// The move the gate will accept next.
    pub fn expected(&self) -> Option<Move> {
        self.solution.get(self.solved_index).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    FreePlay {
        clock_seconds: u64,
    },
    BotPlay {
        /// Unknown until the first full game snapshot arrives.
        local_color: Option<Side>,
        game_id: String,
    },
    PuzzleSolving(PuzzleProgress),
}

impl SessionMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FreePlay { .. } => "free play",
            Self::BotPlay { .. } => "bot play",
            Self::PuzzleSolving(_) => "puzzle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    InsufficientMaterial,
    SeventyFiveMoveRule,
    FivefoldRepetition,
    Agreement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOverReason {
    Checkmate { winner: Side },
    Stalemate,
    Draw(DrawKind),
    Timeout { loser: Side },
    Resignation { winner: Side },
    Aborted,
    Solved,
    /// A terminal server status with no local counterpart.
    Remote(String),
}

impl From<GameOutcome> for GameOverReason {
    fn from(outcome: GameOutcome) -> Self {
        match outcome {
            GameOutcome::Checkmate { winner } => Self::Checkmate { winner },
            GameOutcome::Stalemate => Self::Stalemate,
            GameOutcome::InsufficientMaterial => Self::Draw(DrawKind::InsufficientMaterial),
            GameOutcome::SeventyFiveMoveRule => Self::Draw(DrawKind::SeventyFiveMoveRule),
            GameOutcome::FivefoldRepetition => Self::Draw(DrawKind::FivefoldRepetition),
        }
    }
}

impl GameOverReason {
    /// Map a terminal remote game status.
    pub fn from_remote(status: &str, winner: Option<Side>) -> Self {
        match (status, winner) {
            ("mate", Some(winner)) => Self::Checkmate { winner },
            ("resign", Some(winner)) => Self::Resignation { winner },
            ("outoftime" | "timeout", Some(winner)) => Self::Timeout {
                loser: winner.opposite(),
            },
            ("stalemate", _) => Self::Stalemate,
            ("draw", _) => Self::Draw(DrawKind::Agreement),
            ("aborted" | "noStart", _) => Self::Aborted,
            (other, _) => Self::Remote(other.to_string()),
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkmate { winner } => write!(f, "checkmate, {} wins", winner),
            Self::Stalemate => write!(f, "stalemate"),
            Self::Draw(DrawKind::InsufficientMaterial) => write!(f, "draw by insufficient material"),
            Self::Draw(DrawKind::SeventyFiveMoveRule) => write!(f, "draw by the seventy-five-move rule"),
            Self::Draw(DrawKind::FivefoldRepetition) => write!(f, "draw by fivefold repetition"),
            Self::Draw(DrawKind::Agreement) => write!(f, "draw"),
            Self::Timeout { loser } => write!(f, "{} ran out of time", loser),
            Self::Resignation { winner } => write!(f, "{} wins by resignation", winner),
            Self::Aborted => write!(f, "game aborted"),
            Self::Solved => write!(f, "puzzle solved"),
            Self::Remote(status) => write!(f, "game ended ({})", status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Over(GameOverReason),
}

/// Policy restriction on acceptable moves, independent of legality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedMoveSet {
    Unrestricted,
    Only(SmallVec<[Move; 1]>),
    Nothing,
}

impl AllowedMoveSet {
    pub fn permits(&self, mv: Move) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Only(moves) => moves.contains(&mv),
            Self::Nothing => false,
        }
    }
}

/// Owns the session mode and phase. The allowed move set is derived from
/// them and the current tip on every query.
#[derive(Debug, Clone)]
pub struct ModeController {
    mode: SessionMode,
    phase: SessionPhase,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self {
            mode: SessionMode::Idle,
            phase: SessionPhase::Active,
        }
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.mode, SessionMode::Idle)
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, SessionPhase::Over(_))
    }

    /// Back to `Idle` from any mode.
    pub fn reset(&mut self) {
        self.mode = SessionMode::Idle;
        self.phase = SessionPhase::Active;
    }

    /// Leave `Idle` for `mode`. Callers reset first; entering from another
    /// mode goes through `Idle`.
    pub fn enter(&mut self, mode: SessionMode) {
        if !self.is_idle() {
            tracing::debug!(from = self.mode.name(), "Leaving mode without reset");
        }
        tracing::info!(mode = mode.name(), "Entering mode");
        self.mode = mode;
        self.phase = SessionPhase::Active;
    }

    /// Move to the terminal sub-state. Returns false if already over.
    pub fn finish(&mut self, reason: GameOverReason) -> bool {
        if self.is_over() {
            return false;
        }
        tracing::info!(%reason, "Game over");
        self.phase = SessionPhase::Over(reason);
        true
    }

    /// Re-open a game that ended on the board, after a takeback.
    pub fn reopen(&mut self) {
        self.phase = SessionPhase::Active;
    }

    pub fn local_color(&self) -> Option<Side> {
        match &self.mode {
            SessionMode::BotPlay { local_color, .. } => *local_color,
            _ => None,
        }
    }

    pub fn set_local_color(&mut self, side: Side) {
        if let SessionMode::BotPlay { local_color, .. } = &mut self.mode {
            *local_color = Some(side);
        }
    }

    pub fn game_id(&self) -> Option<&str> {
        match &self.mode {
            SessionMode::BotPlay { game_id, .. } => Some(game_id),
            _ => None,
        }
    }

    pub fn puzzle(&self) -> Option<&PuzzleProgress> {
        match &self.mode {
            SessionMode::PuzzleSolving(progress) => Some(progress),
            _ => None,
        }
    }

    /// Moves the gate accepts on `tip`.
    pub fn allowed_moves(&self, tip: &Position) -> AllowedMoveSet {
        if self.is_over() {
            return AllowedMoveSet::Nothing;
        }
        match &self.mode {
            SessionMode::Idle => AllowedMoveSet::Nothing,
            SessionMode::FreePlay { .. } => AllowedMoveSet::Unrestricted,
            SessionMode::BotPlay { local_color, .. } => {
                if *local_color == Some(tip.side_to_move()) {
                    AllowedMoveSet::Unrestricted
                } else {
                    AllowedMoveSet::Nothing
                }
            }
            SessionMode::PuzzleSolving(progress) => match progress.expected() {
                Some(mv) => AllowedMoveSet::Only(smallvec::smallvec![mv]),
                None => AllowedMoveSet::Nothing,
            },
        }
    }

    /// Side effect an accepted move requires.
    pub fn follow_up(&self) -> FollowUp {
        match self.mode {
            SessionMode::BotPlay { .. } => FollowUp::ForwardToBot,
            SessionMode::PuzzleSolving(_) => FollowUp::AdvancePuzzle,
            _ => FollowUp::None,
        }
    }

    /// Count an accepted solution move. Returns true when the puzzle is
    /// now solved.
    pub fn advance_puzzle(&mut self) -> bool {
        match &mut self.mode {
            SessionMode::PuzzleSolving(progress) => {
                progress.solved_index += 1;
                progress.is_solved()
            }
            _ => false,
        }
    }

    /// Mark the puzzle failed; returns the index of the missed move.
    pub fn fail_puzzle(&mut self) -> Option<usize> {
        match &mut self.mode {
            SessionMode::PuzzleSolving(progress) => {
                progress.failed = true;
                Some(progress.solved_index)
            }
            _ => None,
        }
    }

    /// Whether the "next puzzle" affordance is on offer.
    pub fn can_advance_puzzle(&self) -> bool {
        self.puzzle()
            .is_some_and(|progress| progress.failed || progress.is_solved())
    }
}
