//! Mock RemoteService implementation for testing

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ClientError, ClientResult};
use crate::events::{OnlineBot, Puzzle, RemoteEvent};
use crate::request::BotGameRequest;
use crate::traits::{EventStream, RemoteService};

type Responder<T> = Box<dyn Fn() -> ClientResult<T> + Send>;
type MoveResponder = Box<dyn Fn(&str) -> ClientResult<()> + Send>;

/// Mock service for testing - only compiled in test mode or with mock feature.
/// Clones share responses, call log and event feed.
#[derive(Clone)]
pub struct MockRemoteService {
    responses: Arc<Mutex<MockResponses>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    feed_tx: mpsc::UnboundedSender<ClientResult<RemoteEvent>>,
    feed_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<ClientResult<RemoteEvent>>>>>,
}

#[derive(Default)]
struct MockResponses {
    account_id: Option<String>,
    create_bot_game: Option<Responder<String>>,
    submit_move: Option<MoveResponder>,
    daily_puzzle: Option<Responder<Puzzle>>,
    next_puzzle: Option<Responder<Puzzle>>,
    online_bots: Option<Responder<Vec<OnlineBot>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    AccountId,
    CreateBotGame { request: BotGameRequest },
    SubmitMove { game_id: String, uci: String },
    StreamEvents { game_id: String },
    FetchDailyPuzzle,
    FetchNextPuzzle,
    OnlineBots { limit: usize },
}

impl Default for MockRemoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteService {
    pub fn new() -> Self {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        Self {
            responses: Arc::new(Mutex::new(MockResponses::default())),
            call_log: Arc::new(Mutex::new(Vec::new())),
            feed_tx,
            feed_rx: Arc::new(Mutex::new(Some(feed_rx))),
        }
    }

    pub fn with_account_id(self, id: &str) -> Self {
        self.responses.lock().unwrap().account_id = Some(id.to_string());
        self
    }

    /// Configure create_bot_game response
    pub fn with_create_bot_game_response<F>(self, f: F) -> Self
    where
        F: Fn() -> ClientResult<String> + Send + 'static,
    {
        self.responses.lock().unwrap().create_bot_game = Some(Box::new(f));
        self
    }

    /// Configure submit_move response; the closure receives the UCI move.
    pub fn with_submit_move_response<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> ClientResult<()> + Send + 'static,
    {
        self.responses.lock().unwrap().submit_move = Some(Box::new(f));
        self
    }

    pub fn with_daily_puzzle_response<F>(self, f: F) -> Self
    where
        F: Fn() -> ClientResult<Puzzle> + Send + 'static,
    {
        self.responses.lock().unwrap().daily_puzzle = Some(Box::new(f));
        self
    }

    pub fn with_next_puzzle_response<F>(self, f: F) -> Self
    where
        F: Fn() -> ClientResult<Puzzle> + Send + 'static,
    {
        self.responses.lock().unwrap().next_puzzle = Some(Box::new(f));
        self
    }

    pub fn with_online_bots_response<F>(self, f: F) -> Self
    where
        F: Fn() -> ClientResult<Vec<OnlineBot>> + Send + 'static,
    {
        self.responses.lock().unwrap().online_bots = Some(Box::new(f));
        self
    }

    /// Pre-configure a bot game that is created successfully as `game_id`.
    pub fn with_bot_game(self, game_id: &str) -> Self {
        let game_id = game_id.to_string();
        self.with_create_bot_game_response(move || Ok(game_id.clone()))
            .with_submit_move_response(|_| Ok(()))
    }

    /// Queue an event on the (single) game stream.
    pub fn push_event(&self, event: ClientResult<RemoteEvent>) {
        let _ = self.feed_tx.send(event);
    }

    /// Queue a raw JSON line, decoded the way the real client decodes it.
    pub fn push_json(&self, line: &str) {
        self.push_event(serde_json::from_str(line).map_err(ClientError::from));
    }

    /// Get recorded calls for verification
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Moves submitted so far, in order.
    pub fn submitted_moves(&self) -> Vec<String> {
        self.get_calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::SubmitMove { uci, .. } => Some(uci),
                _ => None,
            })
            .collect()
    }

    /// Clear call history
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    fn record(&self, call: MockCall) {
        self.call_log.lock().unwrap().push(call);
    }

    fn respond<T>(
        &self,
        what: &str,
        pick: impl FnOnce(&MockResponses) -> Option<&Responder<T>>,
    ) -> ClientResult<T> {
        let responses = self.responses.lock().unwrap();
        match pick(&responses) {
            Some(f) => f(),
            None => Err(ClientError::NotConfigured(what.to_string())),
        }
    }
}

#[async_trait]
impl RemoteService for MockRemoteService {
    async fn account_id(&self) -> ClientResult<String> {
        self.record(MockCall::AccountId);
        self.responses
            .lock()
            .unwrap()
            .account_id
            .clone()
            .ok_or_else(|| ClientError::NotConfigured("account_id".to_string()))
    }

    async fn create_bot_game(&self, request: &BotGameRequest) -> ClientResult<String> {
        self.record(MockCall::CreateBotGame {
            request: request.clone(),
        });
        self.respond("create_bot_game", |r| r.create_bot_game.as_ref())
    }

    async fn submit_move(&self, game_id: &str, uci: &str) -> ClientResult<()> {
        self.record(MockCall::SubmitMove {
            game_id: game_id.to_string(),
            uci: uci.to_string(),
        });
        let responses = self.responses.lock().unwrap();
        match responses.submit_move.as_ref() {
            Some(f) => f(uci),
            None => Err(ClientError::NotConfigured("submit_move".to_string())),
        }
    }

    async fn stream_events(&self, game_id: &str) -> ClientResult<EventStream> {
        self.record(MockCall::StreamEvents {
            game_id: game_id.to_string(),
        });
        let rx = self
            .feed_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ClientError::NotConfigured("second stream_events".to_string()))?;
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn fetch_daily_puzzle(&self) -> ClientResult<Puzzle> {
        self.record(MockCall::FetchDailyPuzzle);
        self.respond("fetch_daily_puzzle", |r| r.daily_puzzle.as_ref())
    }

    async fn fetch_next_puzzle(&self) -> ClientResult<Puzzle> {
        self.record(MockCall::FetchNextPuzzle);
        self.respond("fetch_next_puzzle", |r| r.next_puzzle.as_ref())
    }

    async fn online_bots(&self, limit: usize) -> ClientResult<Vec<OnlineBot>> {
        self.record(MockCall::OnlineBots { limit });
        self.respond("online_bots", |r| r.online_bots.as_ref())
    }
}
