use std::sync::Arc;

use chess_client::{BotGameRequest, ClientResult, RemoteService};
use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::Instrument;

use crate::commands::{Completion, CreatedGame, PuzzleSource, SessionCommand, SessionInput};
use crate::error::SessionError;
use crate::events::{Notification, SessionEvent};
use crate::gate::{FollowUp, MoveOutcome};
use crate::snapshot::SessionSnapshot;
use crate::state::SessionState;

/// Background work the actor has in flight. Tasks only hold a weak sender,
/// so dropping every handle still ends the actor.
struct Background {
    service: Arc<dyn RemoteService>,
    input_tx: mpsc::WeakSender<SessionInput>,
    stream: Option<JoinHandle<()>>,
}

/// The main session actor loop.
/// Owns all mutable state. Processes commands and background completions
/// sequentially, in arrival order.
pub(crate) async fn run_session_actor(
    state: SessionState,
    service: Arc<dyn RemoteService>,
    input_rx: mpsc::Receiver<SessionInput>,
    input_tx: mpsc::WeakSender<SessionInput>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let session_id = state.session_id.clone();
    let background = Background {
        service,
        input_tx,
        stream: None,
    };
    run_session_actor_inner(state, background, input_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut background: Background,
    mut input_rx: mpsc::Receiver<SessionInput>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!("Session actor started");

    let mut timer_interval = time::interval(time::Duration::from_millis(100));
    timer_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            input = input_rx.recv() => {
                match input {
                    Some(SessionInput::Command(SessionCommand::Shutdown)) | None => {
                        tracing::info!("Session actor shutting down");
                        background.abort_stream();
                        break;
                    }
                    Some(SessionInput::Command(cmd)) => {
                        handle_command(&mut state, &mut background, cmd, &event_tx);
                    }
                    Some(SessionInput::Completion { generation, completion }) => {
                        handle_completion(&mut state, &mut background, generation, completion, &event_tx);
                    }
                }
            }

            _ = timer_interval.tick(), if state.clock_running() => {
                if state.tick() {
                    // Flag fell
                    publish(&mut state, &event_tx);
                }
            }
        }
    }

    tracing::info!("Session actor exited");
}

/// Broadcast the new state, then any queued notifications.
fn publish(state: &mut SessionState, event_tx: &broadcast::Sender<SessionEvent>) -> SessionSnapshot {
    let snapshot = state.snapshot();
    let _ = event_tx.send(SessionEvent::StateChanged(snapshot.clone()));
    for notification in state.take_notifications() {
        let _ = event_tx.send(SessionEvent::Notification(notification));
    }
    snapshot
}

fn handle_command(
    state: &mut SessionState,
    background: &mut Background,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match cmd {
        SessionCommand::NewGame {
            clock_seconds,
            reply,
        } => {
            background.abort_stream();
            state.new_game(clock_seconds);
            let _ = reply.send(publish(state, event_tx));
        }
        SessionCommand::StartBotGame { request, reply } => {
            background.abort_stream();
            let generation = state.reset();
            publish(state, event_tx);
            background.create_game(generation, request, reply);
        }
        SessionCommand::LoadPuzzle { source, reply } => {
            background.abort_stream();
            let generation = state.reset();
            publish(state, event_tx);
            background.fetch_puzzle(generation, source, reply);
        }
        SessionCommand::ProposeMove { mv, reply } => {
            let outcome = state.propose_move(mv);
            after_proposal(state, background, outcome, event_tx);
            let _ = reply.send(outcome);
        }
        SessionCommand::ProposeUci { uci, reply } => {
            let result = state.propose_uci(&uci);
            if let Ok(outcome) = result {
                after_proposal(state, background, outcome, event_tx);
            }
            let _ = reply.send(result);
        }
        SessionCommand::StepBack { reply } => {
            if state.step_back() {
                let _ = reply.send(publish(state, event_tx));
            } else {
                let _ = reply.send(state.snapshot());
            }
        }
        SessionCommand::StepForward { reply } => {
            if state.step_forward() {
                let _ = reply.send(publish(state, event_tx));
            } else {
                let _ = reply.send(state.snapshot());
            }
        }
        SessionCommand::Undo { reply } => {
            let result = state.undo().map(|()| publish(state, event_tx));
            let _ = reply.send(result);
        }
        SessionCommand::Reset { reply } => {
            background.abort_stream();
            state.reset();
            let _ = reply.send(publish(state, event_tx));
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        SessionCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        // Handled by the loop
        SessionCommand::Shutdown => {}
    }
}

/// Publish the effects of a gate decision and fire off any follow-up.
fn after_proposal(
    state: &mut SessionState,
    background: &Background,
    outcome: MoveOutcome,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match outcome {
        MoveOutcome::Accepted(follow_up) => {
            publish(state, event_tx);
            if follow_up == FollowUp::ForwardToBot {
                match state.submission() {
                    Some((game_id, uci)) => {
                        background.submit_move(state.generation(), game_id, uci);
                    }
                    None => tracing::error!("Accepted bot move has nothing to submit"),
                }
            }
        }
        // Wrong puzzle moves leave a notification behind.
        MoveOutcome::RejectedNotAllowed => {
            publish(state, event_tx);
        }
        _ => {}
    }
}

fn handle_completion(
    state: &mut SessionState,
    background: &mut Background,
    generation: u64,
    completion: Completion,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    if generation != state.generation() {
        tracing::debug!(
            generation,
            current = state.generation(),
            "Ignoring completion from an earlier session"
        );
        completion.supersede();
        return;
    }

    match completion {
        Completion::GameCreated { result, reply } => match result {
            Ok(created) => {
                state.start_bot_play(created.game_id.clone(), created.account_id);
                background.open_stream(generation, created.game_id);
                let _ = reply.send(Ok(publish(state, event_tx)));
            }
            Err(e) => {
                state.notify(Notification::Error {
                    message: format!("failed to create game: {}", e),
                });
                publish(state, event_tx);
                let _ = reply.send(Err(e));
            }
        },
        Completion::PuzzleFetched { result, reply } => {
            match result.and_then(|puzzle| state.load_puzzle(&puzzle)) {
                Ok(()) => {
                    let _ = reply.send(Ok(publish(state, event_tx)));
                }
                Err(e) => {
                    state.notify(Notification::Error {
                        message: format!("failed to load puzzle: {}", e),
                    });
                    publish(state, event_tx);
                    let _ = reply.send(Err(e));
                }
            }
        }
        Completion::RemoteEvent(Ok(event)) => {
            state.on_remote_event(event);
            publish(state, event_tx);
        }
        Completion::RemoteEvent(Err(e)) => {
            tracing::warn!(error = %e, "Dropping undecodable remote event");
        }
        Completion::StreamClosed { error } => {
            background.stream = None;
            match error {
                Some(message) if !state.controller().is_over() => {
                    tracing::error!(%message, "Game stream failed");
                    state.notify(Notification::Error {
                        message: format!("lost the game stream: {}", message),
                    });
                    publish(state, event_tx);
                }
                _ => tracing::info!("Game stream closed"),
            }
        }
        Completion::MoveSubmitted { uci, result } => {
            state.on_move_submitted(&uci, result);
            publish(state, event_tx);
        }
    }
}

impl Background {
    fn abort_stream(&mut self) {
        if let Some(task) = self.stream.take() {
            task.abort();
        }
    }

    fn create_game(
        &self,
        generation: u64,
        request: BotGameRequest,
        reply: tokio::sync::oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    ) {
        let service = self.service.clone();
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            let result = request_game(service.as_ref(), &request)
                .await
                .map_err(SessionError::from);
            deliver(
                &input_tx,
                generation,
                Completion::GameCreated { result, reply },
            )
            .await;
        });
    }

    fn fetch_puzzle(
        &self,
        generation: u64,
        source: PuzzleSource,
        reply: tokio::sync::oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    ) {
        let service = self.service.clone();
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            let result = match source {
                PuzzleSource::Daily => service.fetch_daily_puzzle().await,
                PuzzleSource::Next => service.fetch_next_puzzle().await,
            }
            .map_err(SessionError::from);
            deliver(
                &input_tx,
                generation,
                Completion::PuzzleFetched { result, reply },
            )
            .await;
        });
    }

    /// Fire-and-forget from the gate's point of view; the result comes
    /// back through the queue.
    fn submit_move(&self, generation: u64, game_id: String, uci: String) {
        let service = self.service.clone();
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            let result = service
                .submit_move(&game_id, &uci)
                .await
                .map_err(SessionError::from);
            deliver(
                &input_tx,
                generation,
                Completion::MoveSubmitted { uci, result },
            )
            .await;
        });
    }

    /// Pump the game's event stream into the actor queue.
    fn open_stream(&mut self, generation: u64, game_id: String) {
        self.abort_stream();
        let service = self.service.clone();
        let input_tx = self.input_tx.clone();
        self.stream = Some(tokio::spawn(async move {
            let mut events = match service.stream_events(&game_id).await {
                Ok(events) => events,
                Err(e) => {
                    deliver(
                        &input_tx,
                        generation,
                        Completion::StreamClosed {
                            error: Some(e.to_string()),
                        },
                    )
                    .await;
                    return;
                }
            };
            tracing::debug!(%game_id, "Game stream opened");
            while let Some(event) = events.next().await {
                if !deliver(&input_tx, generation, Completion::RemoteEvent(event)).await {
                    return;
                }
            }
            deliver(
                &input_tx,
                generation,
                Completion::StreamClosed { error: None },
            )
            .await;
        }));
    }
}

async fn request_game(
    service: &dyn RemoteService,
    request: &BotGameRequest,
) -> ClientResult<CreatedGame> {
    let account_id = service.account_id().await?;
    let game_id = service.create_bot_game(request).await?;
    Ok(CreatedGame {
        account_id,
        game_id,
    })
}

/// Hand a completion to the actor. False once the actor is gone.
async fn deliver(
    input_tx: &mpsc::WeakSender<SessionInput>,
    generation: u64,
    completion: Completion,
) -> bool {
    let Some(tx) = input_tx.upgrade() else {
        return false;
    };
    tx.send(SessionInput::Completion {
        generation,
        completion,
    })
    .await
    .is_ok()
}
