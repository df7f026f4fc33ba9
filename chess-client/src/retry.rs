//! Bounded retry for transient remote failures.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClientError, ClientResult};
use crate::events::{OnlineBot, Puzzle};
use crate::request::BotGameRequest;
use crate::traits::{EventStream, RemoteService};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Fixed-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(what, attempts = attempt, "Giving up: {}", e);
                    return Err(ClientError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    tracing::warn!(what, attempt, "Transient failure, retrying: {}", e);
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Decorator that applies a `RetryPolicy` to every call of the wrapped
/// service.
pub struct RetryingService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: RemoteService> RetryingService<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RemoteService> RemoteService for RetryingService<S> {
    async fn account_id(&self) -> ClientResult<String> {
        self.policy
            .run("account_id", || self.inner.account_id())
            .await
    }

    async fn create_bot_game(&self, request: &BotGameRequest) -> ClientResult<String> {
        self.policy
            .run("create_bot_game", || self.inner.create_bot_game(request))
            .await
    }

    async fn submit_move(&self, game_id: &str, uci: &str) -> ClientResult<()> {
        self.policy
            .run("submit_move", || self.inner.submit_move(game_id, uci))
            .await
    }

    async fn stream_events(&self, game_id: &str) -> ClientResult<EventStream> {
        self.policy
            .run("stream_events", || self.inner.stream_events(game_id))
            .await
    }

    async fn fetch_daily_puzzle(&self) -> ClientResult<Puzzle> {
        self.policy
            .run("fetch_daily_puzzle", || self.inner.fetch_daily_puzzle())
            .await
    }

    async fn fetch_next_puzzle(&self) -> ClientResult<Puzzle> {
        self.policy
            .run("fetch_next_puzzle", || self.inner.fetch_next_puzzle())
            .await
    }

    async fn online_bots(&self, limit: usize) -> ClientResult<Vec<OnlineBot>> {
        self.policy
            .run("online_bots", || self.inner.online_bots(limit))
            .await
    }
}
