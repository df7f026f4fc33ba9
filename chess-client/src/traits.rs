//! RemoteService trait abstraction for client implementations

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ClientResult;
use crate::events::{OnlineBot, Puzzle, RemoteEvent};
use crate::request::BotGameRequest;

/// Stream of decoded game events. A line that fails to decode is yielded
/// as an `Err` and the stream carries on.
pub type EventStream = BoxStream<'static, ClientResult<RemoteEvent>>;

/// Core remote chess service interface.
/// Implemented by `LichessClient`, `RetryingService` and `MockRemoteService`.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Identifier of the account the client is authenticated as.
    async fn account_id(&self) -> ClientResult<String>;

    /// Start a game against a bot; returns the game id.
    async fn create_bot_game(&self, request: &BotGameRequest) -> ClientResult<String>;

    /// Play `uci` (standard UCI notation) in `game_id`.
    async fn submit_move(&self, game_id: &str, uci: &str) -> ClientResult<()>;

    /// Open the event stream of `game_id`.
    async fn stream_events(&self, game_id: &str) -> ClientResult<EventStream>;

    async fn fetch_daily_puzzle(&self) -> ClientResult<Puzzle>;

    /// A fresh puzzle for the authenticated account.
    async fn fetch_next_puzzle(&self) -> ClientResult<Puzzle>;

    async fn online_bots(&self, limit: usize) -> ClientResult<Vec<OnlineBot>>;
}
