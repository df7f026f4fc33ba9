//! HTTP client for the Lichess board API

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::error::{ClientError, ClientResult};
use crate::events::{OnlineBot, Puzzle, PuzzleResponse};
use crate::request::{BotGameRequest, BotOpponent};
use crate::traits::{EventStream, RemoteService};

pub const DEFAULT_BASE_URL: &str = "https://lichess.org";

/// Network client for the remote chess server.
pub struct LichessClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    account_id: OnceCell<String>,
}

impl LichessClient {
    /// Build a client for `base_url` authenticated with a personal API token.
    pub fn new(base_url: &str, token: &str) -> ClientResult<Self> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidAddress(base_url.to_string()));
        }
        if token.trim().is_empty() {
            return Err(ClientError::MissingToken);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("chessdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            token: token.trim().to_string(),
            account_id: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> ClientResult<reqwest::Response> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response).await
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> ClientResult<reqwest::Response> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let body = self.get(path).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Pull the game id out of a challenge response. The AI endpoint returns
/// the game itself, the account endpoint wraps it in `challenge`.
fn extract_game_id(body: &serde_json::Value) -> Option<String> {
    body.get("id")
        .or_else(|| body.get("challenge").and_then(|c| c.get("id")))
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

/// Splits a byte stream into newline-terminated lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk; returns every complete, non-blank line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }

    /// Whatever is left once the stream ends.
    pub fn finish(self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

/// Decode an NDJSON response body lazily. Keep-alive blank lines are
/// skipped; undecodable lines become `Err` items without ending the stream.
fn ndjson<T>(response: reqwest::Response) -> futures::stream::BoxStream<'static, ClientResult<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let mut bytes = response.bytes_stream();
    Box::pin(async_stream::stream! {
        let mut buffer = LineBuffer::default();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for line in buffer.push(&chunk) {
                        yield serde_json::from_str::<T>(&line).map_err(ClientError::from);
                    }
                }
                Err(e) => {
                    yield Err(ClientError::Http(e));
                    return;
                }
            }
        }
        if let Some(line) = buffer.finish() {
            yield serde_json::from_str::<T>(&line).map_err(ClientError::from);
        }
    })
}

#[async_trait]
impl RemoteService for LichessClient {
    async fn account_id(&self) -> ClientResult<String> {
        let id = self
            .account_id
            .get_or_try_init(|| async {
                let account: serde_json::Value = self.get_json("/api/account").await?;
                account
                    .get("id")
                    .and_then(|id| id.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| ClientError::InvalidData("account without id".into()))
            })
            .await?;
        Ok(id.clone())
    }

    async fn create_bot_game(&self, request: &BotGameRequest) -> ClientResult<String> {
        let path = match &request.opponent {
            BotOpponent::Ai { .. } => "/api/challenge/ai".to_string(),
            BotOpponent::Account(name) => format!("/api/challenge/{}", name),
        };
        tracing::debug!(%path, time_control = %request.time_control, "Creating bot game");

        let body = self.post_form(&path, &request.form()).await?.text().await?;
        let json: serde_json::Value = serde_json::from_str(&body)?;
        let game_id = extract_game_id(&json)
            .ok_or_else(|| ClientError::InvalidData(format!("no game id in {}", body)))?;

        tracing::info!(%game_id, "Created bot game");
        Ok(game_id)
    }

    async fn submit_move(&self, game_id: &str, uci: &str) -> ClientResult<()> {
        if game_id.is_empty() {
            return Err(ClientError::NoActiveGame);
        }
        let path = format!("/api/board/game/{}/move/{}", game_id, uci);
        self.post_form(&path, &[]).await?;
        tracing::debug!(%game_id, %uci, "Move accepted by server");
        Ok(())
    }

    async fn stream_events(&self, game_id: &str) -> ClientResult<EventStream> {
        if game_id.is_empty() {
            return Err(ClientError::NoActiveGame);
        }
        let response = self
            .get(&format!("/api/board/game/stream/{}", game_id))
            .await?;
        tracing::debug!(%game_id, "Opened game stream");
        Ok(ndjson(response))
    }

    async fn fetch_daily_puzzle(&self) -> ClientResult<Puzzle> {
        let response: PuzzleResponse = self.get_json("/api/puzzle/daily").await?;
        Ok(response.into())
    }

    async fn fetch_next_puzzle(&self) -> ClientResult<Puzzle> {
        let response: PuzzleResponse = self.get_json("/api/puzzle/next").await?;
        Ok(response.into())
    }

    async fn online_bots(&self, limit: usize) -> ClientResult<Vec<OnlineBot>> {
        let response = self.get(&format!("/api/bot/online?nb={}", limit)).await?;
        let mut stream = ndjson::<OnlineBot>(response);
        let mut bots = Vec::new();
        while let Some(bot) = stream.next().await {
            match bot {
                Ok(bot) => bots.push(bot),
                Err(e) => tracing::warn!("Skipping malformed bot entry: {}", e),
            }
        }
        Ok(bots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_address_and_token() {
        assert!(matches!(
            LichessClient::new("lichess.org", "tok"),
            Err(ClientError::InvalidAddress(_))
        ));
        assert!(matches!(
            LichessClient::new(DEFAULT_BASE_URL, "  "),
            Err(ClientError::MissingToken)
        ));
    }

    #[test]
    fn test_url_join() {
        let client = LichessClient::new("https://example.org/", "tok").unwrap();
        assert_eq!(client.url("/api/account"), "https://example.org/api/account");
    }

    #[test]
    fn test_extract_game_id() {
        let ai = serde_json::json!({"id": "g1", "variant": {}});
        let challenge = serde_json::json!({"challenge": {"id": "c1"}});
        assert_eq!(extract_game_id(&ai).as_deref(), Some("g1"));
        assert_eq!(extract_game_id(&challenge).as_deref(), Some("c1"));
        assert_eq!(extract_game_id(&serde_json::json!({})), None);
    }

    #[test]
    fn test_line_buffer_splits_and_skips_keepalive() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"a\":").is_empty());
        let lines = buffer.push(b"1}\n\n{\"b\":2}\n{\"c\"");
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(buffer.push(b":3}").is_empty());
        assert_eq!(buffer.finish().as_deref(), Some("{\"c\":3}"));
    }
}
