use chess::Side;

use crate::time_control::TimeControl;

/// Who to play against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotOpponent {
    /// The server's built-in engine at the given strength (1-8).
    Ai { level: u8 },
    /// A named bot account, challenged like any other player.
    Account(String),
}

/// Which colour the local player asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Random,
    Side(Side),
}

impl ColorChoice {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Side(side) => side.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotGameRequest {
    pub opponent: BotOpponent,
    pub time_control: TimeControl,
    pub rated: bool,
    pub color: ColorChoice,
}

impl Default for BotGameRequest {
    fn default() -> Self {
        Self {
            opponent: BotOpponent::Ai { level: 3 },
            time_control: TimeControl::default(),
            rated: false,
            color: ColorChoice::Random,
        }
    }
}

impl BotGameRequest {
    /// Form parameters for the challenge endpoint.
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("clock.limit", self.time_control.limit_secs().to_string()),
            (
                "clock.increment",
                self.time_control.increment_secs().to_string(),
            ),
            ("color", self.color.as_param().to_string()),
        ];
        match &self.opponent {
            BotOpponent::Ai { level } => form.push(("level", level.to_string())),
            BotOpponent::Account(_) => form.push(("rated", self.rated.to_string())),
        }
        form
    }
}
