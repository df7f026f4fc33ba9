//! Remote Event Reconciler: folds the server's move list into local history.
//!
//! Planning is pure. A plan validates every new remote move on a scratch
//! position before anything is touched, so a bad event is dropped whole.

use chess::{parse_uci_move, to_uci, FenError, Move, UciError};
use thiserror::Error;

use crate::store::PositionStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Unparseable remote move '{text}': {source}")]
    Parse { text: String, source: UciError },

    #[error("Remote move {uci} is illegal in {fen}")]
    IllegalRemoteMove { uci: String, fen: String },

    #[error("Invalid remote position: {0}")]
    InvalidFen(#[from] FenError),
}

/// How local history has to change to match the remote move list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    /// Local history already matches.
    Unchanged,
    /// The remote list lags behind moves we submitted ourselves.
    AwaitingEcho,
    /// Keep the first `keep` plies, then play `moves`.
    Apply { keep: usize, moves: Vec<Move> },
}

/// Diff `remote` against the store.
///
/// Only plies after the common prefix are replayed; already applied moves
/// are never played twice. A remote list shorter than ours is an
/// unacknowledged submission when the gap is at most `pending`, and a
/// takeback otherwise.
pub fn plan(
    store: &PositionStore,
    remote: &[&str],
    pending: usize,
) -> Result<SyncPlan, ReconcileError> {
    let local = store.uci_moves();
    let common = local
        .iter()
        .zip(remote)
        .take_while(|(l, r)| l == r)
        .count();

    if common == local.len() && common == remote.len() {
        return Ok(SyncPlan::Unchanged);
    }
    if common == remote.len() && local.len() - common <= pending {
        return Ok(SyncPlan::AwaitingEcho);
    }

    let mut position = store
        .position_at(common)
        .map_err(|_| ReconcileError::IllegalRemoteMove {
            uci: remote.get(common).copied().unwrap_or_default().to_string(),
            fen: store.tip().fen(),
        })?
        .clone();
    let mut moves = Vec::with_capacity(remote.len() - common);
    for text in &remote[common..] {
        let mv = parse_uci_move(&position, text).map_err(|source| ReconcileError::Parse {
            text: text.to_string(),
            source,
        })?;
        position = position
            .play(mv)
            .map_err(|e| ReconcileError::IllegalRemoteMove {
                uci: text.to_string(),
                fen: e.fen,
            })?;
        moves.push(mv);
    }
    Ok(SyncPlan::Apply {
        keep: common,
        moves,
    })
}

/// Carry out an `Apply` plan. Moves were validated by `plan`.
pub fn apply(store: &mut PositionStore, keep: usize, moves: &[Move]) -> Result<(), ReconcileError> {
    store.truncate(keep);
    for &mv in moves {
        if store.apply(mv).is_err() {
            return Err(ReconcileError::IllegalRemoteMove {
                uci: to_uci(store.tip(), mv),
                fen: store.tip().fen(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(moves: &[&str]) -> PositionStore {
        let mut store = PositionStore::default();
        for uci in moves {
            let mv = parse_uci_move(store.tip(), uci).unwrap();
            store.apply(mv).unwrap();
        }
        store
    }

    #[test]
    fn test_identical_list_is_noop() {
        let store = store_with(&["e2e4", "e7e5"]);
        assert_eq!(
            plan(&store, &["e2e4", "e7e5"], 0).unwrap(),
            SyncPlan::Unchanged
        );
    }

    #[test]
    fn test_extension_applies_only_suffix() {
        let mut store = store_with(&["e2e4"]);
        let SyncPlan::Apply { keep, moves } = plan(&store, &["e2e4", "e7e5", "g1f3"], 0).unwrap()
        else {
            panic!("expected apply plan");
        };
        assert_eq!(keep, 1);
        assert_eq!(moves.len(), 2);

        apply(&mut store, keep, &moves).unwrap();
        assert_eq!(store.uci_moves(), vec!["e2e4", "e7e5", "g1f3"]);
        assert_eq!(
            plan(&store, &["e2e4", "e7e5", "g1f3"], 0).unwrap(),
            SyncPlan::Unchanged
        );
    }

    #[test]
    fn test_lagging_list_waits_for_echo() {
        let store = store_with(&["e2e4"]);
        assert_eq!(plan(&store, &[], 1).unwrap(), SyncPlan::AwaitingEcho);
    }

    #[test]
    fn test_lagging_list_without_pending_is_takeback() {
        let mut store = store_with(&["e2e4", "e7e5"]);
        let plan = plan(&store, &["e2e4"], 0).unwrap();
        assert_eq!(
            plan,
            SyncPlan::Apply {
                keep: 1,
                moves: vec![]
            }
        );
        if let SyncPlan::Apply { keep, moves } = plan {
            apply(&mut store, keep, &moves).unwrap();
        }
        assert_eq!(store.uci_moves(), vec!["e2e4"]);
    }

    #[test]
    fn test_divergent_list_replaces_local_tail() {
        let store = store_with(&["e2e4", "e7e5"]);
        let SyncPlan::Apply { keep, moves } = plan(&store, &["e2e4", "c7c5"], 0).unwrap() else {
            panic!("expected apply plan");
        };
        assert_eq!(keep, 1);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn test_bad_moves_reject_whole_event() {
        let store = store_with(&["e2e4"]);
        assert!(matches!(
            plan(&store, &["e2e4", "e7e5", "zz"], 0),
            Err(ReconcileError::Parse { .. })
        ));
        assert!(matches!(
            plan(&store, &["e2e4", "e7e4"], 0),
            Err(ReconcileError::IllegalRemoteMove { .. })
        ));
        assert_eq!(store.ply_count(), 1);
    }

    #[test]
    fn test_remote_castling_matches_local_record() {
        let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
        let mut store = PositionStore::new(chess::Position::from_fen(fen).unwrap());
        let mv = parse_uci_move(store.tip(), "e1g1").unwrap();
        store.apply(mv).unwrap();
        assert_eq!(plan(&store, &["e1g1"], 0).unwrap(), SyncPlan::Unchanged);
    }
}
