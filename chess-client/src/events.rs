//! Wire shapes of the remote game stream and puzzle endpoints.
//!
//! These mirror the server's JSON; unknown fields are ignored so that
//! server-side additions do not break decoding.

use serde::Deserialize;

/// One line of the NDJSON game stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RemoteEvent {
    GameFull(GameFull),
    GameState(GameState),
    ChatLine(ChatLine),
    OpponentGone(OpponentGone),
    #[serde(other)]
    Unknown,
}

/// Initial snapshot: both players, the start position and the state so far.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFull {
    pub id: String,
    pub white: GamePlayer,
    pub black: GamePlayer,
    #[serde(default = "startpos")]
    pub initial_fen: String,
    pub state: GameState,
    #[serde(default)]
    pub rated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub rating: Option<u32>,
    pub title: Option<String>,
    pub ai_level: Option<u8>,
}

/// Incremental update. `moves` is the full space-separated UCI move list
/// from the initial position, not just the latest move.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub moves: String,
    #[serde(default)]
    pub wtime: u64,
    #[serde(default)]
    pub btime: u64,
    #[serde(default)]
    pub winc: u64,
    #[serde(default)]
    pub binc: u64,
    #[serde(default = "started")]
    pub status: String,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatLine {
    pub username: String,
    pub text: String,
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentGone {
    pub gone: bool,
    pub claim_win_in_seconds: Option<u64>,
}

fn startpos() -> String {
    "startpos".to_string()
}

fn started() -> String {
    "started".to_string()
}

impl GameState {
    pub fn move_list(&self) -> Vec<&str> {
        self.moves.split_whitespace().collect()
    }

    /// Whether the server still considers the game in progress.
    pub fn is_ongoing(&self) -> bool {
        matches!(self.status.as_str(), "created" | "started")
    }
}

impl GamePlayer {
    pub fn display_name(&self) -> String {
        match (&self.name, self.ai_level) {
            (Some(name), _) => name.clone(),
            (None, Some(level)) => format!("AI level {}", level),
            (None, None) => "anonymous".to_string(),
        }
    }
}

/// A daily (or next) puzzle: the game leading up to it and the expected
/// continuation in UCI.
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub id: String,
    pub rating: u32,
    pub starting_pgn: String,
    pub solution: Vec<String>,
    pub initial_ply: u32,
    pub themes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PuzzleResponse {
    pub game: PuzzleGame,
    pub puzzle: PuzzleInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PuzzleGame {
    pub pgn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PuzzleInfo {
    pub id: String,
    #[serde(default)]
    pub rating: u32,
    pub solution: Vec<String>,
    #[serde(default)]
    pub initial_ply: u32,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl From<PuzzleResponse> for Puzzle {
    fn from(r: PuzzleResponse) -> Self {
        Self {
            id: r.puzzle.id,
            rating: r.puzzle.rating,
            starting_pgn: r.game.pgn,
            solution: r.puzzle.solution,
            initial_ply: r.puzzle.initial_ply,
            themes: r.puzzle.themes,
        }
    }
}

/// An online bot account that accepts challenges.
#[derive(Debug, Clone, Deserialize)]
pub struct OnlineBot {
    pub id: String,
    pub username: String,
}
