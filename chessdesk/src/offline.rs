//! Stand-in remote service used when no API token is configured.

use async_trait::async_trait;
use chess_client::{
    BotGameRequest, ClientError, ClientResult, EventStream, OnlineBot, Puzzle, RemoteService,
};

/// Refuses every remote call with `MissingToken`. Free play never calls
/// the remote service, so it works unchanged on top of this.
pub struct OfflineService;

#[async_trait]
impl RemoteService for OfflineService {
    async fn account_id(&self) -> ClientResult<String> {
        Err(ClientError::MissingToken)
    }

    async fn create_bot_game(&self, _request: &BotGameRequest) -> ClientResult<String> {
        Err(ClientError::MissingToken)
    }

    async fn submit_move(&self, _game_id: &str, _uci: &str) -> ClientResult<()> {
        Err(ClientError::MissingToken)
    }

    async fn stream_events(&self, _game_id: &str) -> ClientResult<EventStream> {
        Err(ClientError::MissingToken)
    }

    async fn fetch_daily_puzzle(&self) -> ClientResult<Puzzle> {
        Err(ClientError::MissingToken)
    }

    async fn fetch_next_puzzle(&self) -> ClientResult<Puzzle> {
        Err(ClientError::MissingToken)
    }

    async fn online_bots(&self, _limit: usize) -> ClientResult<Vec<OnlineBot>> {
        Err(ClientError::MissingToken)
    }
}
