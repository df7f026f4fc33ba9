use chess::Move;
use chess_client::BotGameRequest;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::commands::{PuzzleSource, SessionCommand, SessionInput};
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::gate::MoveOutcome;
use crate::snapshot::SessionSnapshot;

/// Cheap, cloneable handle to a session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    input_tx: mpsc::Sender<SessionInput>,
}

fn reply_dropped(_: oneshot::error::RecvError) -> SessionError {
    SessionError::Internal("Reply dropped".into())
}

impl SessionHandle {
    pub(crate) fn new(id: String, input_tx: mpsc::Sender<SessionInput>) -> Self {
        Self { id, input_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Start a free-play game; `None` uses the configured clock.
    pub async fn new_game(&self, clock_seconds: Option<u64>) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::NewGame {
            clock_seconds,
            reply: tx,
        })
        .await?;
        rx.await.map_err(reply_dropped)
    }

    /// Create a remote bot game and enter bot play once it exists.
    pub async fn start_bot_game(
        &self,
        request: BotGameRequest,
    ) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::StartBotGame { request, reply: tx })
            .await?;
        rx.await.map_err(reply_dropped)?
    }

    pub async fn load_puzzle(&self, source: PuzzleSource) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::LoadPuzzle { source, reply: tx })
            .await?;
        rx.await.map_err(reply_dropped)?
    }

    pub async fn propose_move(&self, mv: Move) -> Result<MoveOutcome, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::ProposeMove { mv, reply: tx })
            .await?;
        rx.await.map_err(reply_dropped)
    }

    /// Propose a move in standard UCI notation (`e2e4`, `e1g1`, `e7e8q`).
    pub async fn propose_uci(&self, uci: &str) -> Result<MoveOutcome, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::ProposeUci {
            uci: uci.to_string(),
            reply: tx,
        })
        .await?;
        rx.await.map_err(reply_dropped)?
    }

    pub async fn step_back(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::StepBack { reply: tx }).await?;
        rx.await.map_err(reply_dropped)
    }

    pub async fn step_forward(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::StepForward { reply: tx }).await?;
        rx.await.map_err(reply_dropped)
    }

    pub async fn undo(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Undo { reply: tx }).await?;
        rx.await.map_err(reply_dropped)?
    }

    /// Abandon whatever is running and go back to idle.
    pub async fn reset(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Reset { reply: tx }).await?;
        rx.await.map_err(reply_dropped)
    }

    pub async fn get_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        rx.await.map_err(reply_dropped)
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SessionEvent>), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Subscribe { reply: tx }).await?;
        rx.await.map_err(reply_dropped)
    }

    pub async fn shutdown(&self) {
        let _ = self
            .input_tx
            .send(SessionInput::Command(SessionCommand::Shutdown))
            .await;
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.input_tx
            .send(SessionInput::Command(cmd))
            .await
            .map_err(|_| SessionError::Internal("Session actor closed".into()))
    }
}
