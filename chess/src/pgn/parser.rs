use cozy_chess::Move;
use std::collections::HashMap;

use super::san::{parse_san, SanError};
use crate::fen::FenError;
use crate::position::Position;

/// A parsed PGN game: tags, starting position, the main line and the
/// position it ends in.
#[derive(Debug, Clone)]
pub struct PgnGame {
    pub tags: HashMap<String, String>,
    pub start: Position,
    pub moves: Vec<Move>,
    pub end: Position,
}

const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Parse a single PGN game. Only the main line is kept; comments,
/// variations and NAGs are skipped.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    let mut tags = HashMap::new();
    let mut movetext = String::new();

    for line in input.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            let (key, value) = parse_tag(line)?;
            tags.insert(key, value);
        } else if !line.starts_with('%') {
            let line = line.split(';').next().unwrap_or_default();
            movetext.push_str(line);
            movetext.push(' ');
        }
    }

    let start = match tags.get("FEN") {
        Some(fen) => Position::from_fen(fen)?,
        None => Position::startpos(),
    };

    let mut position = start.clone();
    let mut moves = Vec::new();
    for token in tokenize(&movetext)? {
        let mv = parse_san(&position, &token).map_err(|source| PgnError::Move {
            ply: moves.len() + 1,
            source,
        })?;
        position = position.play(mv).map_err(|_| PgnError::Move {
            ply: moves.len() + 1,
            source: SanError::NoLegalMove(token.clone()),
        })?;
        moves.push(mv);
    }

    Ok(PgnGame {
        tags,
        start,
        moves,
        end: position,
    })
}

fn parse_tag(line: &str) -> Result<(String, String), PgnError> {
    let inner = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or_else(|| PgnError::InvalidTag(line.to_string()))?;
    let (key, value) = inner
        .split_once(char::is_whitespace)
        .ok_or_else(|| PgnError::InvalidTag(line.to_string()))?;
    let value = value
        .trim()
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| PgnError::InvalidTag(line.to_string()))?;
    Ok((key.to_string(), value.to_string()))
}

/// Split movetext into SAN tokens, dropping comments, variations, NAGs,
/// move numbers and result markers.
fn tokenize(movetext: &str) -> Result<Vec<String>, PgnError> {
    let mut cleaned = String::with_capacity(movetext.len());
    let mut depth = 0usize;
    let mut in_comment = false;

    for c in movetext.chars() {
        if in_comment {
            if c == '}' {
                in_comment = false;
                cleaned.push(' ');
            }
            continue;
        }
        match c {
            '{' => in_comment = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or(PgnError::UnbalancedVariation)?;
                cleaned.push(' ');
            }
            _ if depth > 0 => {}
            c => cleaned.push(c),
        }
    }

    if in_comment {
        return Err(PgnError::UnterminatedComment);
    }
    if depth != 0 {
        return Err(PgnError::UnbalancedVariation);
    }

    Ok(cleaned
        .split_whitespace()
        .filter_map(strip_move_number)
        .filter(|t| !t.starts_with('$') && !RESULT_TOKENS.contains(t))
        .map(str::to_string)
        .collect())
}

/// `12.e4` -> `e4`, `12...` -> nothing.
fn strip_move_number(token: &str) -> Option<&str> {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == token.len() {
        return Some(token);
    }
    if rest.starts_with('.') {
        let rest = rest.trim_start_matches('.');
        return (!rest.is_empty()).then_some(rest);
    }
    // Digits not followed by a dot: a result token such as "1-0".
    Some(token)
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Unterminated comment")]
    UnterminatedComment,
    #[error("Unbalanced variation parentheses")]
    UnbalancedVariation,
    #[error("FEN tag error: {0}")]
    Fen(#[from] FenError),
    #[error("Move {ply}: {source}")]
    Move { ply: usize, source: SanError },
}
