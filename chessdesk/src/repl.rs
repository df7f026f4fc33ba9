//! Line-based terminal front end driving a session handle.

use std::io::Write;
use std::time::Duration;

use chess::{parse_san, parse_uci_move, DisplayBoard, Move, Position, Side};
use session::{
    format_time, MoveOutcome, Notification, PuzzleSource, SessionError, SessionEvent,
    SessionHandle, SessionMode, SessionPhase, SessionSnapshot,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

const HELP: &str = "\
commands:
  <move>     play a move in UCI (e2e4, e7e8q) or SAN (e4, Nf3, O-O)
  back, b    step back through the history
  forward, f step forward through the history
  undo, u    take back the last move (free play)
  board      show the board again
  moves      list the legal moves here
  next, n    load the next puzzle once this one is solved or failed
  help       this text
  quit, q    leave";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Move(String),
    Back,
    Forward,
    Undo,
    Board,
    Moves,
    Next,
    Help,
    Quit,
    Empty,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "back" | "b" => Self::Back,
            "forward" | "f" => Self::Forward,
            "undo" | "u" => Self::Undo,
            "board" => Self::Board,
            "moves" => Self::Moves,
            "next" | "n" => Self::Next,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Move(line.to_string()),
        }
    }
}

/// Resolve move text on the displayed board, trying UCI before SAN.
pub fn resolve_move(position: &Position, text: &str) -> Option<Move> {
    parse_uci_move(position, text)
        .ok()
        .or_else(|| parse_san(position, text).ok())
}

fn orientation(snap: &SessionSnapshot) -> Side {
    snap.local_color.unwrap_or(Side::White)
}

/// Board plus a status block for `snap`.
pub fn render(snap: &SessionSnapshot) -> String {
    let mut out = String::new();
    match Position::from_fen(&snap.displayed_fen) {
        Ok(position) => out.push_str(&DisplayBoard::from_position(&position).render(orientation(snap))),
        Err(e) => out.push_str(&format!("(cannot draw {}: {})\n", snap.displayed_fen, e)),
    }

    out.push_str(&format!("mode: {}", snap.mode.name()));
    if let SessionMode::PuzzleSolving(progress) = &snap.mode {
        out.push_str(&format!(
            " #{} ({}), {}/{} solved",
            progress.id,
            progress.rating,
            progress.solved_index,
            progress.solution.len()
        ));
    }
    out.push('\n');

    if let Some(clock) = &snap.clock {
        out.push_str(&format!(
            "white {}  black {}\n",
            format_time(Duration::from_millis(clock.white_remaining_ms)),
            format_time(Duration::from_millis(clock.black_remaining_ms)),
        ));
    }
    if snap.cursor != snap.ply_count {
        out.push_str(&format!("reviewing ply {} of {}\n", snap.cursor, snap.ply_count));
    }
    if !snap.history.is_empty() {
        out.push_str(&snap.history_text(1));
        out.push('\n');
    }
    match &snap.phase {
        SessionPhase::Over(reason) => out.push_str(&format!("game over: {}\n", reason)),
        SessionPhase::Active => {
            out.push_str(&format!("{} to move\n", snap.displayed_side_to_move))
        }
    }
    out
}

pub fn describe(notification: &Notification) -> String {
    match notification {
        Notification::WrongMove { solved_index } => format!(
            "wrong move after {} correct; try again or type 'next'",
            solved_index
        ),
        Notification::GameOver { reason } => format!("game over: {}", reason),
        Notification::Error { message } => format!("error: {}", message),
        Notification::Orientation { local } => format!("you play {}", local),
    }
}

fn describe_rejection(outcome: MoveOutcome) -> Option<&'static str> {
    match outcome {
        MoveOutcome::Accepted(_) => None,
        MoveOutcome::RejectedIllegal => Some("illegal move"),
        MoveOutcome::RejectedWrongTurn => Some("not your piece to move"),
        MoveOutcome::RejectedNotAllowed => Some("move not allowed right now"),
    }
}

/// Print notifications, and redraw when the remote side moves.
pub fn spawn_event_printer(mut events: broadcast::Receiver<SessionEvent>) {
    tokio::spawn(async move {
        let mut last_ply = 0;
        loop {
            match events.recv().await {
                Ok(SessionEvent::Notification(n)) => println!("\n{}", describe(&n)),
                Ok(SessionEvent::StateChanged(snap)) => {
                    let remote_moved = matches!(snap.mode, SessionMode::BotPlay { .. })
                        && snap.ply_count > last_ply
                        && snap
                            .history
                            .last()
                            .is_some_and(|h| Some(h.side) != snap.local_color);
                    last_ply = snap.ply_count;
                    if remote_moved {
                        print!("\n{}> ", render(&snap));
                        let _ = std::io::stdout().flush();
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(handle: &SessionHandle) -> anyhow::Result<()> {
    let (snap, events) = handle.subscribe().await?;
    spawn_event_printer(events);
    println!("{}", render(&snap));
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match Input::parse(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Board => println!("{}", render(&handle.get_snapshot().await?)),
            Input::Moves => {
                let snap = handle.get_snapshot().await?;
                if snap.playable_moves.is_empty() {
                    println!("no moves available here");
                } else {
                    println!("{}", snap.playable_moves.join(" "));
                }
            }
            Input::Back => println!("{}", render(&handle.step_back().await?)),
            Input::Forward => println!("{}", render(&handle.step_forward().await?)),
            Input::Undo => match handle.undo().await {
                Ok(snap) => println!("{}", render(&snap)),
                Err(e) => println!("{}", e),
            },
            Input::Next => {
                let snap = handle.get_snapshot().await?;
                if !snap.can_advance_puzzle {
                    println!("solve or fail the current puzzle first");
                    continue;
                }
                match handle.load_puzzle(PuzzleSource::Next).await {
                    Ok(snap) => println!("{}", render(&snap)),
                    Err(e) => println!("{}", e),
                }
            }
            Input::Move(text) => play(handle, &text).await?,
        }
    }
    Ok(())
}

/// The board move input is read against: the displayed one in free play,
/// where moving from an earlier position branches the game. Other modes only
/// accept moves on the latest position, so reviewing refuses input.
pub fn input_fen(snap: &SessionSnapshot) -> Option<&str> {
    match snap.mode {
        SessionMode::FreePlay { .. } => Some(snap.displayed_fen.as_str()),
        _ if snap.cursor == snap.ply_count => Some(snap.tip_fen.as_str()),
        _ => None,
    }
}

async fn play(handle: &SessionHandle, text: &str) -> Result<(), SessionError> {
    let snap = handle.get_snapshot().await?;
    let Some(fen) = input_fen(&snap) else {
        println!("return to the latest position ('forward') to move");
        return Ok(());
    };
    let position = Position::from_fen(fen)?;
    let Some(mv) = resolve_move(&position, text) else {
        println!("cannot read '{}' as a move; type 'help' for commands", text);
        return Ok(());
    };
    let outcome = handle.propose_move(mv).await?;
    match describe_rejection(outcome) {
        Some(reason) => println!("{}", reason),
        None => println!("{}", render(&handle.get_snapshot().await?)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::STANDARD_FEN;
    use session::GameOverReason;

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse("  e2e4 "), Input::Move("e2e4".into()));
        assert_eq!(Input::parse("Nf3"), Input::Move("Nf3".into()));
        assert_eq!(Input::parse("B"), Input::Back);
        assert_eq!(Input::parse("forward"), Input::Forward);
        assert_eq!(Input::parse("q"), Input::Quit);
        assert_eq!(Input::parse(""), Input::Empty);
    }

    #[test]
    fn test_resolve_move_accepts_uci_and_san() {
        let start = Position::startpos();
        let uci = resolve_move(&start, "g1f3").unwrap();
        let san = resolve_move(&start, "Nf3").unwrap();
        assert_eq!(uci, san);
        assert!(resolve_move(&start, "Ke2").is_none());
    }

    #[test]
    fn test_describe_notifications() {
        let over = Notification::GameOver {
            reason: GameOverReason::Solved,
        };
        assert_eq!(describe(&over), "game over: puzzle solved");
        assert!(describe(&Notification::WrongMove { solved_index: 2 }).contains("2 correct"));
    }

    fn snapshot(mode: SessionMode, cursor: usize, ply_count: usize) -> SessionSnapshot {
        SessionSnapshot {
            session_id: "s".into(),
            mode,
            phase: SessionPhase::Active,
            tip_fen: STANDARD_FEN.into(),
            displayed_fen: STANDARD_FEN.into(),
            displayed_side_to_move: Side::White,
            cursor,
            ply_count,
            history: vec![],
            playable_moves: vec![],
            allowed: session::AllowedMoveSet::Unrestricted,
            clock: None,
            local_color: None,
            can_advance_puzzle: false,
        }
    }

    #[test]
    fn test_render_shows_board_and_status() {
        let snap = snapshot(SessionMode::FreePlay { clock_seconds: 300 }, 0, 0);
        let text = render(&snap);
        assert!(text.contains("mode: free play"));
        assert!(text.contains("white to move"));
        assert!(text.starts_with('8'));
    }

    #[test]
    fn test_input_board_follows_mode() {
        let earlier = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let mut snap = snapshot(SessionMode::FreePlay { clock_seconds: 300 }, 1, 2);
        snap.displayed_fen = earlier.into();
        assert_eq!(input_fen(&snap), Some(earlier));

        snap.mode = SessionMode::BotPlay {
            local_color: Some(Side::White),
            game_id: "g1".into(),
        };
        assert_eq!(input_fen(&snap), None);

        snap.cursor = 2;
        assert_eq!(input_fen(&snap), Some(STANDARD_FEN));
    }
}
