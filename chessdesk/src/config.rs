//! Runtime configuration for chessdesk.
//!
//! Every tunable has a compile-time default and can be overridden via a
//! dedicated environment variable. Command-line flags take precedence over
//! both where a subcommand exposes one.

use std::path::PathBuf;
use std::time::Duration;

/// Default remote server.
const DEFAULT_LICHESS_URL: &str = "https://lichess.org";

/// Default number of attempts for a transient remote failure.
const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Default pause between attempts (in milliseconds).
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

/// Default free-play clock per side (in seconds).
const DEFAULT_CLOCK_SECS: u64 = 300;

/// Default directory for the daily rolling log file.
const DEFAULT_LOG_DIR: &str = "logs";

/// Get the API token for the remote server.
///
/// Returns `None` when `CHESSDESK_LICHESS_TOKEN` is unset or blank. Free
/// play works without one; bot games and puzzles do not.
pub fn get_lichess_token() -> Option<String> {
    std::env::var("CHESSDESK_LICHESS_TOKEN")
        .ok()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Get the remote server base URL.
///
/// Priority:
/// 1. `CHESSDESK_LICHESS_URL` env variable if set
/// 2. `https://lichess.org` as fallback
pub fn get_lichess_url() -> String {
    if let Ok(url) = std::env::var("CHESSDESK_LICHESS_URL") {
        return url;
    }

    DEFAULT_LICHESS_URL.to_string()
}

/// Get the retry budget for transient remote failures.
///
/// Falls back to the default if `CHESSDESK_RETRY_ATTEMPTS` cannot be parsed.
pub fn get_retry_attempts() -> u32 {
    parse_or("CHESSDESK_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS)
}

pub fn get_retry_backoff() -> Duration {
    Duration::from_millis(parse_or(
        "CHESSDESK_RETRY_BACKOFF_MS",
        DEFAULT_RETRY_BACKOFF_MS,
    ))
}

/// Get the free-play clock per side in seconds.
pub fn get_clock_secs() -> u64 {
    parse_or("CHESSDESK_CLOCK_SECS", DEFAULT_CLOCK_SECS)
}

/// Get the log directory.
///
/// Priority:
/// 1. `CHESSDESK_LOG_DIR` env variable if set
/// 2. `logs` as fallback
pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSDESK_LOG_DIR") {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    match std::env::var(var) {
        Ok(value) => value.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}
