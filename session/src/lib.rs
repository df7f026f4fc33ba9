//! Game session state machine for the chessdesk client.
//!
//! A session owns the authoritative position history, gates proposed moves
//! according to the active mode (free play, bot play, puzzle solving),
//! reconciles the remote game stream, and drives the clocks. Each session
//! runs as a single tokio task; [`SessionHandle`] talks to it and
//! [`SessionEvent`]s report every change.

mod actor;
mod commands;
mod error;
mod events;
mod gate;
mod handle;
mod mode;
mod navigation;
mod reconciler;
mod snapshot;
mod state;
mod store;
mod timer;

use std::sync::Arc;

use chess_client::RemoteService;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

pub use commands::PuzzleSource;
pub use error::SessionError;
pub use events::{Notification, SessionEvent};
pub use gate::{evaluate, FollowUp, MoveOutcome};
pub use handle::SessionHandle;
pub use mode::{
    AllowedMoveSet, DrawKind, GameOverReason, ModeController, PuzzleProgress, SessionMode,
    SessionPhase,
};
pub use navigation::NavigationCursor;
pub use reconciler::{ReconcileError, SyncPlan};
pub use snapshot::{HistoryEntry, SessionSnapshot};
pub use store::{MoveRecord, PositionStore, StoreError};
pub use timer::{format_time, ChessClock, ClockSnapshot};

use actor::run_session_actor;
use state::SessionState;

/// Default time per side in free play.
pub const DEFAULT_CLOCK_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Free-play clock per side when a game does not name one.
    pub clock_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock_seconds: DEFAULT_CLOCK_SECS,
        }
    }
}

/// Spawn a session actor on the current runtime and return its handle.
/// The session starts idle.
pub fn spawn_session(service: Arc<dyn RemoteService>, config: SessionConfig) -> SessionHandle {
    let session_id = Uuid::new_v4().to_string();
    let (input_tx, input_rx) = mpsc::channel(64);
    let (event_tx, _) = broadcast::channel(256);

    let state = SessionState::new(session_id.clone(), config.clock_seconds);
    tokio::spawn(run_session_actor(
        state,
        service,
        input_rx,
        input_tx.downgrade(),
        event_tx,
    ));

    tracing::info!(id = %session_id, "Session spawned");
    SessionHandle::new(session_id, input_tx)
}
