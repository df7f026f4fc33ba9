use std::sync::Arc;
use std::time::Duration;

use chess::{parse_uci_move, Position, Side};
use chess_client::{
    BotGameRequest, ClientError, MockRemoteService, Puzzle, RetryPolicy, RetryingService,
};
use session::{
    spawn_session, AllowedMoveSet, FollowUp, GameOverReason, MoveOutcome, Notification,
    PuzzleSource, SessionConfig, SessionError, SessionEvent, SessionHandle, SessionMode,
    SessionPhase, SessionSnapshot,
};
use tokio::sync::broadcast;

fn spawn(mock: MockRemoteService) -> SessionHandle {
    spawn_session(Arc::new(mock), SessionConfig::default())
}

/// Wait for the first state change matching `pred`.
async fn wait_for_state(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let SessionEvent::StateChanged(snap) = events.recv().await.unwrap() {
                if pred(&snap) {
                    return snap;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for state")
}

async fn wait_for_notification(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&Notification) -> bool,
) -> Notification {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let SessionEvent::Notification(n) = events.recv().await.unwrap() {
                if pred(&n) {
                    return n;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for notification")
}

fn game_full(white: &str, moves: &str) -> String {
    format!(
        r#"{{"type":"gameFull","id":"g1","rated":false,"white":{{"id":"{}","name":"{}"}},"black":{{"aiLevel":3}},"initialFen":"startpos","state":{{"type":"gameState","moves":"{}","wtime":300000,"btime":300000,"winc":0,"binc":0,"status":"started"}}}}"#,
        white, white, moves
    )
}

fn game_state(moves: &str, status: &str) -> String {
    format!(
        r#"{{"type":"gameState","moves":"{}","wtime":290000,"btime":295000,"winc":0,"binc":0,"status":"{}"}}"#,
        moves, status
    )
}

fn daily_puzzle() -> Puzzle {
    Puzzle {
        id: "daily1".into(),
        rating: 1500,
        starting_pgn: String::new(),
        solution: vec!["d2d4".into(), "g8f6".into()],
        initial_ply: 0,
        themes: vec!["opening".into()],
    }
}

#[tokio::test]
async fn free_play_review_shows_earlier_position() {
    let handle = spawn(MockRemoteService::new());
    handle.new_game(None).await.unwrap();
    for uci in ["e2e4", "e7e5", "g1f3"] {
        assert_eq!(
            handle.propose_uci(uci).await.unwrap(),
            MoveOutcome::Accepted(FollowUp::None)
        );
    }
    handle.step_back().await.unwrap();
    let snap = handle.step_back().await.unwrap();

    assert_eq!(snap.cursor, 1);
    let start = Position::startpos();
    let after_e4 = start.play(parse_uci_move(&start, "e2e4").unwrap()).unwrap();
    assert_eq!(snap.displayed_fen, after_e4.fen());
    assert_eq!(snap.ply_count, 3);
    assert_eq!(snap.history_text(1), "1. e4 e5 2. Nf3");
}

#[tokio::test]
async fn navigation_clamps_at_both_ends() {
    let handle = spawn(MockRemoteService::new());
    handle.new_game(None).await.unwrap();
    let snap = handle.step_back().await.unwrap();
    assert_eq!(snap.cursor, 0);

    handle.propose_uci("d2d4").await.unwrap();
    let snap = handle.step_forward().await.unwrap();
    assert_eq!(snap.cursor, 1);
    assert_eq!(snap.tip_fen, snap.displayed_fen);
}

#[tokio::test]
async fn rejected_proposals_are_idempotent() {
    let handle = spawn(MockRemoteService::new());
    let before = handle.new_game(None).await.unwrap();
    for _ in 0..2 {
        assert_eq!(
            handle.propose_uci("e2e5").await.unwrap(),
            MoveOutcome::RejectedIllegal
        );
    }
    let after = handle.get_snapshot().await.unwrap();
    assert_eq!(before.tip_fen, after.tip_fen);
    assert_eq!(after.ply_count, 0);

    assert!(matches!(
        handle.propose_uci("nonsense").await,
        Err(SessionError::Parse(_))
    ));
}

#[tokio::test]
async fn bot_play_follows_remote_turns() {
    let mock = MockRemoteService::new()
        .with_account_id("alice")
        .with_bot_game("g1");
    let handle = spawn(mock.clone());
    let (_, mut events) = handle.subscribe().await.unwrap();

    let snap = handle
        .start_bot_game(BotGameRequest::default())
        .await
        .unwrap();
    assert!(matches!(snap.mode, SessionMode::BotPlay { .. }));

    mock.push_json(&game_full("alice", "e2e4"));
    let snap = wait_for_state(&mut events, |s| s.ply_count == 1).await;
    assert_eq!(snap.local_color, Some(Side::White));
    assert_eq!(snap.allowed, AllowedMoveSet::Nothing);
    assert!(snap.playable_moves.is_empty());
    assert_eq!(
        handle.propose_uci("e7e5").await.unwrap(),
        MoveOutcome::RejectedNotAllowed
    );

    mock.push_json(&game_state("e2e4 e7e5", "started"));
    let snap = wait_for_state(&mut events, |s| s.ply_count == 2).await;
    assert_eq!(snap.allowed, AllowedMoveSet::Unrestricted);

    assert_eq!(
        handle.propose_uci("g1f3").await.unwrap(),
        MoveOutcome::Accepted(FollowUp::ForwardToBot)
    );
    // Echo of our own move, then the same state again: both no-ops.
    mock.push_json(&game_state("e2e4 e7e5 g1f3", "started"));
    mock.push_json(&game_state("e2e4 e7e5 g1f3", "started"));
    mock.push_json(&game_state("e2e4 e7e5 g1f3 b8c6", "started"));
    let snap = wait_for_state(&mut events, |s| s.ply_count == 4).await;
    let line: Vec<_> = snap.history.iter().map(|h| h.uci.as_str()).collect();
    assert_eq!(line, vec!["e2e4", "e7e5", "g1f3", "b8c6"]);
    assert_eq!(mock.submitted_moves(), vec!["g1f3"]);
}

#[tokio::test]
async fn bot_game_orientation_and_remote_end() {
    let mock = MockRemoteService::new()
        .with_account_id("alice")
        .with_bot_game("g1");
    let handle = spawn(mock.clone());
    let (_, mut events) = handle.subscribe().await.unwrap();
    handle
        .start_bot_game(BotGameRequest::default())
        .await
        .unwrap();

    mock.push_json(&game_full("alice", ""));
    let orientation =
        wait_for_notification(&mut events, |n| matches!(n, Notification::Orientation { .. }))
            .await;
    assert_eq!(orientation, Notification::Orientation { local: Side::White });

    mock.push_json(r#"{"type":"gameState","moves":"","status":"resign","winner":"black"}"#);
    let over = wait_for_notification(&mut events, |n| matches!(n, Notification::GameOver { .. }))
        .await;
    assert_eq!(
        over,
        Notification::GameOver {
            reason: GameOverReason::Resignation { winner: Side::Black }
        }
    );
}

#[tokio::test]
async fn malformed_stream_line_does_not_stop_reconciliation() {
    let mock = MockRemoteService::new()
        .with_account_id("alice")
        .with_bot_game("g1");
    let handle = spawn(mock.clone());
    let (_, mut events) = handle.subscribe().await.unwrap();
    handle
        .start_bot_game(BotGameRequest::default())
        .await
        .unwrap();

    mock.push_json(&game_full("alice", ""));
    mock.push_json("{not json");
    mock.push_json(&game_state("e2e4 e7e5 xx", "started"));
    mock.push_json(&game_state("e2e4", "started"));
    let snap = wait_for_state(&mut events, |s| s.ply_count == 1).await;
    assert_eq!(snap.history[0].uci, "e2e4");
}

#[tokio::test]
async fn exhausted_submission_is_reported_and_taken_back() {
    let mock = MockRemoteService::new()
        .with_account_id("alice")
        .with_create_bot_game_response(|| Ok("g1".to_string()))
        .with_submit_move_response(|_| {
            Err(ClientError::Status {
                status: 503,
                body: "busy".into(),
            })
        });
    let service = RetryingService::new(
        mock.clone(),
        RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(1),
        },
    );
    let handle = spawn_session(Arc::new(service), SessionConfig::default());
    let (_, mut events) = handle.subscribe().await.unwrap();
    handle
        .start_bot_game(BotGameRequest::default())
        .await
        .unwrap();
    mock.push_json(&game_full("alice", ""));
    wait_for_state(&mut events, |s| s.local_color == Some(Side::White)).await;

    assert!(handle.propose_uci("e2e4").await.unwrap().is_accepted());
    let error = wait_for_notification(&mut events, |n| matches!(n, Notification::Error { .. }))
        .await;
    let Notification::Error { message } = error else {
        unreachable!();
    };
    assert!(message.contains("e2e4"), "{message}");

    let snap = handle.get_snapshot().await.unwrap();
    assert_eq!(snap.ply_count, 0);
    assert_eq!(mock.submitted_moves().len(), 5);
}

#[tokio::test]
async fn puzzle_solution_is_tracked_to_the_end() {
    let mock = MockRemoteService::new().with_daily_puzzle_response(|| Ok(daily_puzzle()));
    let handle = spawn(mock);

    let snap = handle.load_puzzle(PuzzleSource::Daily).await.unwrap();
    assert_eq!(snap.solved_index(), Some(0));
    assert!(snap.clock.is_none());

    assert_eq!(
        handle.propose_uci("d2d4").await.unwrap(),
        MoveOutcome::Accepted(FollowUp::AdvancePuzzle)
    );
    assert_eq!(handle.get_snapshot().await.unwrap().solved_index(), Some(1));
    assert!(handle.propose_uci("g8f6").await.unwrap().is_accepted());

    let snap = handle.get_snapshot().await.unwrap();
    assert_eq!(snap.solved_index(), Some(2));
    assert_eq!(snap.phase, SessionPhase::Over(GameOverReason::Solved));
    assert!(snap.can_advance_puzzle);
    assert_eq!(
        handle.propose_uci("e2e4").await.unwrap(),
        MoveOutcome::RejectedNotAllowed
    );
}

#[tokio::test]
async fn wrong_puzzle_move_notifies_and_offers_next() {
    let mock = MockRemoteService::new()
        .with_daily_puzzle_response(|| Ok(daily_puzzle()))
        .with_next_puzzle_response(|| {
            Ok(Puzzle {
                id: "next1".into(),
                starting_pgn: "e4 e5".into(),
                solution: vec!["g1f3".into()],
                ..daily_puzzle()
            })
        });
    let handle = spawn(mock);
    let (_, mut events) = handle.subscribe().await.unwrap();
    handle.load_puzzle(PuzzleSource::Daily).await.unwrap();

    assert_eq!(
        handle.propose_uci("e2e4").await.unwrap(),
        MoveOutcome::RejectedNotAllowed
    );
    let wrong = wait_for_notification(&mut events, |n| matches!(n, Notification::WrongMove { .. }))
        .await;
    assert_eq!(wrong, Notification::WrongMove { solved_index: 0 });

    let snap = handle.get_snapshot().await.unwrap();
    assert_eq!(snap.ply_count, 0);
    assert!(snap.can_advance_puzzle);

    let snap = handle.load_puzzle(PuzzleSource::Next).await.unwrap();
    let SessionMode::PuzzleSolving(progress) = snap.mode else {
        panic!("expected puzzle mode");
    };
    assert_eq!(progress.id, "next1");
    assert!(!progress.failed);
}

#[tokio::test]
async fn puzzle_fetch_failure_leaves_session_idle() {
    let handle = spawn(MockRemoteService::new());
    let (_, mut events) = handle.subscribe().await.unwrap();
    let result = handle.load_puzzle(PuzzleSource::Daily).await;
    assert!(matches!(result, Err(SessionError::RemoteFatal(_))));
    wait_for_notification(&mut events, |n| matches!(n, Notification::Error { .. })).await;
    assert_eq!(handle.get_snapshot().await.unwrap().mode, SessionMode::Idle);
}

#[tokio::test]
async fn reset_supersedes_in_flight_game_events() {
    let mock = MockRemoteService::new()
        .with_account_id("alice")
        .with_bot_game("g1");
    let handle = spawn(mock.clone());
    handle
        .start_bot_game(BotGameRequest::default())
        .await
        .unwrap();
    handle.new_game(None).await.unwrap();

    mock.push_json(&game_full("alice", "e2e4"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snap = handle.get_snapshot().await.unwrap();
    assert!(matches!(snap.mode, SessionMode::FreePlay { .. }));
    assert_eq!(snap.ply_count, 0);
}
