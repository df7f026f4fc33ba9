//! chessdesk: play free games, bot games and puzzles from the terminal.
//!
//! Every subcommand except `bots` runs a session and hands it to the
//! line-based front end in [`repl`]. Remote features talk to the Lichess API
//! and need `CHESSDESK_LICHESS_TOKEN`; free play works offline. See
//! [`config`] for all tunables.

use std::sync::Arc;

use chess::Side;
use chess_client::{
    BotGameRequest, BotOpponent, ColorChoice, LichessClient, RemoteService, RetryPolicy,
    RetryingService, TimeControl,
};
use clap::{Parser, Subcommand, ValueEnum};
use session::{spawn_session, PuzzleSource, SessionConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod offline;
mod repl;

#[derive(Parser)]
#[command(name = "chessdesk", about = "Terminal chess: free play, bot games and puzzles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Two players at one keyboard.
    Play {
        /// Seconds per side (defaults to CHESSDESK_CLOCK_SECS).
        #[arg(long)]
        clock: Option<u64>,
    },
    /// Play a remote bot game.
    Bot {
        /// Strength of the server's built-in AI (1-8).
        #[arg(long, default_value_t = 3, conflicts_with = "opponent")]
        level: u8,
        /// Challenge a named bot account instead of the built-in AI.
        #[arg(long)]
        opponent: Option<String>,
        /// Time control as `minutes+increment`.
        #[arg(long, default_value = "5+0")]
        time_control: TimeControl,
        #[arg(long)]
        rated: bool,
        #[arg(long, value_enum, default_value_t = ColorArg::Random)]
        color: ColorArg,
    },
    /// Solve the daily puzzle, or a fresh one with `--next`.
    Puzzle {
        #[arg(long)]
        next: bool,
    },
    /// List bot accounts that are online now.
    Bots {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorArg {
    White,
    Black,
    Random,
}

impl From<ColorArg> for ColorChoice {
    fn from(color: ColorArg) -> Self {
        match color {
            ColorArg::White => ColorChoice::Side(Side::White),
            ColorArg::Black => ColorChoice::Side(Side::Black),
            ColorArg::Random => ColorChoice::Random,
        }
    }
}

/// Build the remote service: the Lichess client behind the retry decorator,
/// or an offline stand-in when no token is configured.
fn remote_service() -> anyhow::Result<Arc<dyn RemoteService>> {
    let Some(token) = config::get_lichess_token() else {
        tracing::info!("No API token configured, remote features disabled");
        return Ok(Arc::new(offline::OfflineService));
    };
    let client = LichessClient::new(&config::get_lichess_url(), &token)?;
    let policy = RetryPolicy {
        max_attempts: config::get_retry_attempts(),
        backoff: config::get_retry_backoff(),
    };
    Ok(Arc::new(RetryingService::new(client, policy)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to a daily file so log lines never land on the board
    let log_dir = config::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chessdesk");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("chessdesk starting up");

    let service = remote_service()?;

    let handle = spawn_session(
        service.clone(),
        SessionConfig {
            clock_seconds: config::get_clock_secs(),
        },
    );

    let started = match cli.command {
        Commands::Play { clock } => handle.new_game(clock).await,
        Commands::Bot {
            level,
            opponent,
            time_control,
            rated,
            color,
        } => {
            let request = BotGameRequest {
                opponent: match opponent {
                    Some(name) => BotOpponent::Account(name),
                    None => BotOpponent::Ai { level },
                },
                time_control,
                rated,
                color: color.into(),
            };
            println!("Creating game...");
            handle.start_bot_game(request).await
        }
        Commands::Puzzle { next } => {
            let source = if next {
                PuzzleSource::Next
            } else {
                PuzzleSource::Daily
            };
            handle.load_puzzle(source).await
        }
        Commands::Bots { limit } => {
            handle.shutdown().await;
            for bot in service.online_bots(limit).await? {
                println!("{}", bot.username);
            }
            return Ok(());
        }
    };

    if let Err(e) = started {
        handle.shutdown().await;
        return Err(e.into());
    }

    let result = repl::run(&handle).await;
    handle.shutdown().await;

    tracing::info!("chessdesk shutting down");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bot_defaults() {
        let cli = Cli::try_parse_from(["chessdesk", "bot"]).unwrap();
        let Commands::Bot {
            level,
            opponent,
            time_control,
            rated,
            color,
        } = cli.command
        else {
            panic!("expected bot command");
        };
        assert_eq!(level, 3);
        assert!(opponent.is_none());
        assert_eq!(time_control, TimeControl::default());
        assert!(!rated);
        assert_eq!(ColorChoice::from(color), ColorChoice::Random);
    }

    #[test]
    fn test_bot_time_control_and_color() {
        let cli = Cli::try_parse_from([
            "chessdesk",
            "bot",
            "--opponent",
            "maia1",
            "--time-control",
            "3+2",
            "--color",
            "black",
        ])
        .unwrap();
        let Commands::Bot {
            opponent,
            time_control,
            color,
            ..
        } = cli.command
        else {
            panic!("expected bot command");
        };
        assert_eq!(opponent.as_deref(), Some("maia1"));
        assert_eq!(time_control.time, Duration::from_secs(180));
        assert_eq!(time_control.increment, Duration::from_secs(2));
        assert_eq!(ColorChoice::from(color), ColorChoice::Side(Side::Black));
    }

    #[test]
    fn test_level_conflicts_with_opponent() {
        assert!(Cli::try_parse_from(["chessdesk", "bot", "--level", "5", "--opponent", "x"]).is_err());
        assert!(Cli::try_parse_from(["chessdesk", "bot", "--time-control", "fast"]).is_err());
    }

    #[test]
    fn test_play_and_puzzle_flags() {
        let cli = Cli::try_parse_from(["chessdesk", "play", "--clock", "60"]).unwrap();
        assert!(matches!(cli.command, Commands::Play { clock: Some(60) }));
        let cli = Cli::try_parse_from(["chessdesk", "puzzle", "--next"]).unwrap();
        assert!(matches!(cli.command, Commands::Puzzle { next: true }));
    }
}
