use chess::Move;
use chess_client::{BotGameRequest, ClientResult, Puzzle, RemoteEvent};
use tokio::sync::{broadcast, oneshot};

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::gate::MoveOutcome;
use crate::snapshot::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleSource {
    Daily,
    Next,
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub enum SessionCommand {
    NewGame {
        clock_seconds: Option<u64>,
        reply: oneshot::Sender<SessionSnapshot>,
    },
    StartBotGame {
        request: BotGameRequest,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    LoadPuzzle {
        source: PuzzleSource,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    ProposeMove {
        mv: Move,
        reply: oneshot::Sender<MoveOutcome>,
    },
    ProposeUci {
        uci: String,
        reply: oneshot::Sender<Result<MoveOutcome, SessionError>>,
    },
    StepBack {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    StepForward {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Undo {
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    Reset {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown,
}

/// Result of background work, marshalled back onto the actor's queue.
pub(crate) enum Completion {
    GameCreated {
        result: Result<CreatedGame, SessionError>,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    PuzzleFetched {
        result: Result<Puzzle, SessionError>,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    RemoteEvent(ClientResult<RemoteEvent>),
    StreamClosed {
        error: Option<String>,
    },
    MoveSubmitted {
        uci: String,
        result: Result<(), SessionError>,
    },
}

pub(crate) struct CreatedGame {
    pub account_id: String,
    pub game_id: String,
}

/// Everything the actor consumes, in one totally ordered queue.
pub(crate) enum SessionInput {
    Command(SessionCommand),
    /// Tagged with the generation that spawned the work.
    Completion {
        generation: u64,
        completion: Completion,
    },
}

impl Completion {
    /// Answer a waiting caller whose request was overtaken by a reset.
    pub(crate) fn supersede(self) {
        let superseded = || SessionError::NotAllowed("superseded by a newer request".into());
        match self {
            Self::GameCreated { reply, .. } | Self::PuzzleFetched { reply, .. } => {
                let _ = reply.send(Err(superseded()));
            }
            _ => {}
        }
    }
}
