//! Remote chess server client library
//!
//! Provides the `RemoteService` abstraction the session core talks to, an
//! HTTP implementation for the Lichess board API, a bounded-retry decorator
//! and (behind the `mock` feature) a scriptable mock.
//!
//! # Example
//!
//! ```no_run
//! use chess_client::{LichessClient, RemoteService, RetryPolicy, RetryingService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LichessClient::new("https://lichess.org", "my-token")?;
//!     let client = RetryingService::new(client, RetryPolicy::default());
//!     let puzzle = client.fetch_daily_puzzle().await?;
//!     println!("Today's puzzle: {}", puzzle.id);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod events;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod request;
mod retry;
mod time_control;
mod traits;

pub use client::{LichessClient, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult};
pub use events::{
    ChatLine, GameFull, GamePlayer, GameState, OnlineBot, OpponentGone, Puzzle, RemoteEvent,
};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCall, MockRemoteService};
pub use request::{BotGameRequest, BotOpponent, ColorChoice};
pub use retry::{RetryPolicy, RetryingService, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS};
pub use time_control::{InvalidTimeControl, TimeControl};
pub use traits::{EventStream, RemoteService};
