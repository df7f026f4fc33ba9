use std::time::Duration;

use chess::{parse_pgn, parse_uci_move, to_uci, Move, Position, Side};
use chess_client::{GameFull, GameState, Puzzle, RemoteEvent};

use crate::error::SessionError;
use crate::events::Notification;
use crate::gate::{self, FollowUp, MoveOutcome};
use crate::mode::{GameOverReason, ModeController, PuzzleProgress, SessionMode, SessionPhase};
use crate::navigation::NavigationCursor;
use crate::reconciler::{self, ReconcileError, SyncPlan};
use crate::snapshot::{HistoryEntry, SessionSnapshot};
use crate::store::PositionStore;
use crate::timer::ChessClock;

/// Internal mutable state, owned entirely by the session actor. No locks.
pub(crate) struct SessionState {
    pub session_id: String,
    generation: u64,
    store: PositionStore,
    controller: ModeController,
    cursor: NavigationCursor,
    clock: Option<ChessClock>,
    default_clock_secs: u64,
    account_id: Option<String>,
    /// Our bot-game moves the server has not echoed yet.
    pending_submissions: usize,
    outbox: Vec<Notification>,
}

impl SessionState {
    pub fn new(session_id: String, default_clock_secs: u64) -> Self {
        Self {
            session_id,
            generation: 0,
            store: PositionStore::default(),
            controller: ModeController::new(),
            cursor: NavigationCursor::new(),
            clock: None,
            default_clock_secs,
            account_id: None,
            pending_submissions: 0,
            outbox: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    pub fn notify(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    /// Back to `Idle` on the standard start position. Starts a new
    /// generation, so work spawned before this point is ignored.
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.clear(Position::startpos());
        tracing::debug!(generation = self.generation, "Session reset");
        self.generation
    }

    fn clear(&mut self, start: Position) {
        self.store.reset(start);
        self.controller.reset();
        self.cursor = NavigationCursor::new();
        self.clock = None;
        self.pending_submissions = 0;
    }

    /// Start a local two-player game. White's clock starts immediately.
    pub fn new_game(&mut self, clock_seconds: Option<u64>) {
        self.reset();
        let clock_seconds = clock_seconds.unwrap_or(self.default_clock_secs);
        self.controller
            .enter(SessionMode::FreePlay { clock_seconds });
        let mut clock = ChessClock::new(Duration::from_secs(clock_seconds));
        clock.switch_to(self.store.tip().side_to_move());
        self.clock = Some(clock);
    }

    /// Enter bot play for a freshly created remote game. The local colour
    /// is learned from the first full game snapshot.
    pub fn start_bot_play(&mut self, game_id: String, account_id: String) {
        self.clear(Position::startpos());
        tracing::info!(%game_id, account = %account_id, "Bot game created");
        self.account_id = Some(account_id);
        self.controller.enter(SessionMode::BotPlay {
            local_color: None,
            game_id,
        });
    }

    /// Load a puzzle: the start is where the puzzle's game PGN ends, and
    /// every solution move must be legal in sequence. Nothing changes if
    /// the puzzle does not parse.
    pub fn load_puzzle(&mut self, puzzle: &Puzzle) -> Result<(), SessionError> {
        let start = parse_pgn(&puzzle.starting_pgn)?.end;
        let mut position = start.clone();
        let mut solution = Vec::with_capacity(puzzle.solution.len());
        for text in &puzzle.solution {
            let mv = parse_uci_move(&position, text)?;
            position = position
                .play(mv)
                .map_err(|e| SessionError::Parse(format!("puzzle solution: {}", e)))?;
            solution.push(mv);
        }
        if solution.is_empty() {
            return Err(SessionError::Parse(format!(
                "puzzle {} has no solution",
                puzzle.id
            )));
        }

        self.clear(start);
        tracing::info!(id = %puzzle.id, rating = puzzle.rating, plies = solution.len(), "Puzzle loaded");
        self.controller
            .enter(SessionMode::PuzzleSolving(PuzzleProgress {
                id: puzzle.id.clone(),
                rating: puzzle.rating,
                solution,
                solution_uci: puzzle.solution.clone(),
                solved_index: 0,
                failed: false,
            }));
        Ok(())
    }

    /// History index of the position the gate evaluates. Free play follows
    /// the cursor (a move from an earlier position starts a new line);
    /// bot play and puzzles always play on the tip.
    fn gate_index(&self) -> usize {
        match self.controller.mode() {
            SessionMode::FreePlay { .. } => self.cursor.index(),
            _ => self.store.ply_count(),
        }
    }

    fn gate_position(&self) -> &Position {
        self.store
            .position_at(self.gate_index())
            .unwrap_or_else(|_| self.store.tip())
    }

    /// Run the Move Gate and, on acceptance, apply the move.
    pub fn propose_move(&mut self, mv: Move) -> MoveOutcome {
        let index = self.gate_index();
        let outcome = gate::evaluate(&self.controller, self.gate_position(), mv);
        match outcome {
            MoveOutcome::Accepted(follow_up) => {
                if let Err(e) = self.accept(index, mv, follow_up) {
                    tracing::error!(error = %e, "Gate accepted a move the store refused");
                    return MoveOutcome::RejectedIllegal;
                }
            }
            MoveOutcome::RejectedNotAllowed
                if self.controller.puzzle().is_some() && !self.controller.is_over() =>
            {
                if let Some(solved_index) = self.controller.fail_puzzle() {
                    tracing::debug!(solved_index, "Wrong puzzle move");
                    self.notify(Notification::WrongMove { solved_index });
                }
            }
            _ => {}
        }
        tracing::debug!(?outcome, "Move proposed");
        outcome
    }

    /// Parse standard UCI against the gate position, then propose it.
    pub fn propose_uci(&mut self, text: &str) -> Result<MoveOutcome, SessionError> {
        let mv = parse_uci_move(self.gate_position(), text)?;
        Ok(self.propose_move(mv))
    }

    fn accept(
        &mut self,
        index: usize,
        mv: Move,
        follow_up: FollowUp,
    ) -> Result<(), SessionError> {
        if index < self.store.ply_count() {
            tracing::debug!(from = index, "Discarding forward history");
            self.store.truncate(index);
        }
        self.store.apply(mv)?;
        self.cursor.jump_to(self.store.ply_count());

        match follow_up {
            FollowUp::AdvancePuzzle => {
                if self.controller.advance_puzzle() {
                    self.finish(GameOverReason::Solved);
                }
                return Ok(());
            }
            FollowUp::ForwardToBot => self.pending_submissions += 1,
            FollowUp::None => {}
        }

        let to_move = self.store.tip().side_to_move();
        if let Some(clock) = self.clock.as_mut() {
            clock.switch_to(to_move);
        }
        if let Some(outcome) = self.store.outcome() {
            self.finish(outcome.into());
        }
        Ok(())
    }

    fn finish(&mut self, reason: GameOverReason) {
        if self.controller.finish(reason.clone()) {
            if let Some(clock) = self.clock.as_mut() {
                clock.pause();
            }
            self.notify(Notification::GameOver { reason });
        }
    }

    /// Game id and UCI text of the move awaiting submission.
    pub fn submission(&self) -> Option<(String, String)> {
        let game_id = self.controller.game_id()?;
        let last = self.store.moves().last()?;
        Some((game_id.to_string(), last.uci().to_string()))
    }

    /// Take back the last ply of a free-play game.
    pub fn undo(&mut self) -> Result<(), SessionError> {
        if !matches!(self.controller.mode(), SessionMode::FreePlay { .. }) {
            return Err(SessionError::NotAllowed(format!(
                "undo is not available in {}",
                self.controller.mode().name()
            )));
        }
        if let SessionPhase::Over(GameOverReason::Timeout { .. }) = self.controller.phase() {
            return Err(SessionError::NotAllowed("the game was lost on time".into()));
        }
        if self.store.pop().is_none() {
            return Ok(());
        }
        self.controller.reopen();
        self.cursor.jump_to(self.store.ply_count());
        let to_move = self.store.tip().side_to_move();
        if let Some(clock) = self.clock.as_mut() {
            clock.switch_to(to_move);
        }
        Ok(())
    }

    fn cursor_max(&self) -> usize {
        match self.controller.puzzle() {
            Some(progress) => progress.solution.len(),
            None => self.store.ply_count(),
        }
    }

    pub fn step_back(&mut self) -> bool {
        self.cursor.step_back()
    }

    pub fn step_forward(&mut self) -> bool {
        let max = self.cursor_max();
        self.cursor.step_forward(max)
    }

    /// Position under the cursor. In a puzzle the cursor may run ahead of
    /// the solved moves; those positions replay the solution from the tip.
    pub fn displayed_position(&self) -> Position {
        let index = self.cursor.index();
        match self.controller.puzzle() {
            Some(progress) if index > self.store.ply_count() => {
                let mut position = self.store.tip().clone();
                for &mv in &progress.solution[self.store.ply_count()..index] {
                    match position.play(mv) {
                        Ok(next) => position = next,
                        Err(_) => break,
                    }
                }
                position
            }
            _ => self
                .store
                .position_at(index)
                .unwrap_or_else(|_| self.store.tip())
                .clone(),
        }
    }

    /// Fold one remote stream event into the session. Bad events are
    /// logged and dropped.
    pub fn on_remote_event(&mut self, event: RemoteEvent) {
        if self.controller.game_id().is_none() {
            tracing::debug!("Remote event outside bot play ignored");
            return;
        }
        let result = match event {
            RemoteEvent::GameFull(full) => self.on_game_full(full),
            RemoteEvent::GameState(state) => self.on_game_state(&state),
            RemoteEvent::ChatLine(line) => {
                tracing::info!(user = %line.username, room = %line.room, "{}", line.text);
                Ok(())
            }
            RemoteEvent::OpponentGone(gone) => {
                tracing::info!(gone = gone.gone, "Opponent presence changed");
                Ok(())
            }
            RemoteEvent::Unknown => {
                tracing::debug!("Unknown remote event ignored");
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Dropping remote event");
        }
    }

    fn on_game_full(&mut self, full: GameFull) -> Result<(), ReconcileError> {
        let start = Position::from_fen(&full.initial_fen)?;
        if self.store.start() != &start {
            // Validate against the new start before discarding local history.
            reconciler::plan(&PositionStore::new(start.clone()), &full.state.move_list(), 0)?;
            self.store.reset(start);
            self.cursor = NavigationCursor::new();
            self.pending_submissions = 0;
        }

        match self.local_side(&full) {
            Some(local) => {
                self.controller.set_local_color(local);
                self.notify(Notification::Orientation { local });
            }
            None => {
                tracing::warn!(game = %full.id, "Authenticated account plays neither side");
                self.notify(Notification::Error {
                    message: format!("you are not a player in game {}", full.id),
                });
            }
        }
        self.on_game_state(&full.state)
    }

    fn local_side(&self, full: &GameFull) -> Option<Side> {
        let account = self.account_id.as_deref()?;
        let is = |id: &Option<String>| {
            id.as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(account))
        };
        if is(&full.white.id) {
            Some(Side::White)
        } else if is(&full.black.id) {
            Some(Side::Black)
        } else {
            None
        }
    }

    fn on_game_state(&mut self, state: &GameState) -> Result<(), ReconcileError> {
        let remote = state.move_list();
        match reconciler::plan(&self.store, &remote, self.pending_submissions)? {
            SyncPlan::Unchanged => self.pending_submissions = 0,
            SyncPlan::AwaitingEcho => {
                tracing::debug!(pending = self.pending_submissions, "Waiting for move echo");
            }
            SyncPlan::Apply { keep, moves } => {
                let following = self.cursor.index() == self.store.ply_count();
                reconciler::apply(&mut self.store, keep, &moves)?;
                self.pending_submissions = 0;
                if following {
                    self.cursor.jump_to(self.store.ply_count());
                } else {
                    self.cursor.clamp(self.store.ply_count());
                }
                tracing::debug!(kept = keep, applied = moves.len(), "Remote moves folded in");
            }
        }

        self.sync_clock(state);
        if !state.is_ongoing() {
            let winner = state.winner.as_deref().and_then(Side::from_name);
            self.finish(GameOverReason::from_remote(&state.status, winner));
        } else if let Some(outcome) = self.store.outcome() {
            self.finish(outcome.into());
        }
        Ok(())
    }

    /// Mirror the server's clocks. Untimed games carry no readings.
    fn sync_clock(&mut self, state: &GameState) {
        if state.wtime == 0 && state.btime == 0 {
            return;
        }
        let running = (state.is_ongoing() && !self.store.is_empty())
            .then(|| self.store.tip().side_to_move());
        self.clock
            .get_or_insert_with(|| ChessClock::new(Duration::ZERO))
            .sync(
                Duration::from_millis(state.wtime),
                Duration::from_millis(state.btime),
                running,
            );
    }

    /// Result of forwarding `uci` to the server. A failure takes the move
    /// back if the server never saw it, and is surfaced as a notification.
    pub fn on_move_submitted(&mut self, uci: &str, result: Result<(), SessionError>) {
        if self.controller.is_over() {
            match &result {
                Ok(()) => tracing::debug!(uci, "Submission result after game over ignored"),
                Err(e) => {
                    tracing::warn!(uci, error = %e, "Move submission failed after game over")
                }
            }
            return;
        }
        let err = match result {
            Ok(()) => {
                tracing::debug!(uci, "Move accepted by server");
                return;
            }
            Err(e) => e,
        };
        tracing::error!(uci, error = %err, "Move submission failed");
        let unacknowledged = self.pending_submissions > 0
            && self.store.moves().last().is_some_and(|r| r.uci() == uci);
        if unacknowledged {
            self.store.pop();
            self.pending_submissions -= 1;
            self.cursor.jump_to(self.store.ply_count());
        }
        self.notify(Notification::Error {
            message: format!("failed to send move {}: {}", uci, err),
        });
    }

    pub fn clock_running(&self) -> bool {
        !self.controller.is_over() && self.clock.as_ref().is_some_and(ChessClock::is_running)
    }

    /// Advance the running clock. Returns true when the session changed
    /// phase (a free-play flag fell). In bot play the server decides.
    pub fn tick(&mut self) -> bool {
        let Some(clock) = self.clock.as_mut() else {
            return false;
        };
        let Some(loser) = clock.tick() else {
            return false;
        };
        match self.controller.mode() {
            SessionMode::FreePlay { .. } => {
                self.finish(GameOverReason::Timeout { loser });
                true
            }
            _ => {
                tracing::debug!(%loser, "Flag fell, waiting for the server");
                false
            }
        }
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let displayed = self.displayed_position();
        let gate_position = self.gate_position();
        let playable_moves = if self.cursor.index() == self.gate_index() {
            gate_position
                .legal_moves()
                .into_iter()
                .filter(|&mv| gate::evaluate(&self.controller, gate_position, mv).is_accepted())
                .map(|mv| to_uci(gate_position, mv))
                .collect()
        } else {
            Vec::new()
        };

        SessionSnapshot {
            session_id: self.session_id.clone(),
            mode: self.controller.mode().clone(),
            phase: self.controller.phase().clone(),
            tip_fen: self.store.tip().fen(),
            displayed_fen: displayed.fen(),
            displayed_side_to_move: displayed.side_to_move(),
            cursor: self.cursor.index(),
            ply_count: self.store.ply_count(),
            history: self
                .store
                .moves()
                .iter()
                .map(|record| HistoryEntry {
                    uci: record.uci().to_string(),
                    san: record.san().to_string(),
                    side: record.side(),
                })
                .collect(),
            playable_moves,
            allowed: self.controller.allowed_moves(self.store.tip()),
            clock: self.clock.as_ref().map(ChessClock::snapshot),
            local_color: self.controller.local_color(),
            can_advance_puzzle: self.controller.can_advance_puzzle(),
        }
    }
}
