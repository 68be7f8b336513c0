use std::{fmt, str::FromStr};

use crate::libserver::error::ProtocolError;

pub const CHOICES: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    /// Token used on the wire, in both directions.
    pub fn token(self) -> &'static str {
        match self {
            Choice::Rock => "Pierre",
            Choice::Paper => "Feuille",
            Choice::Scissors => "Ciseaux",
        }
    }

    pub fn beats(self, other: Choice) -> bool {
        matches!(
            (self, other),
            (Choice::Rock, Choice::Scissors)
                | (Choice::Scissors, Choice::Paper)
                | (Choice::Paper, Choice::Rock)
        )
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Choice {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CHOICES
            .iter()
            .copied()
            .find(|c| c.token() == s)
            .ok_or_else(|| ProtocolError::UnknownChoice(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Draw,
    Player1Wins,
    Player2Wins,
}

pub fn resolve(p1_selected: Choice, p2_selected: Choice) -> Outcome {
    if p1_selected == p2_selected {
        Outcome::Draw
    } else if p1_selected.beats(p2_selected) {
        Outcome::Player1Wins
    } else {
        Outcome::Player2Wins
    }
}

/// Anything starting with `O` or `o` means "keep playing".
pub fn parse_vote(line: &str) -> bool {
    line.starts_with(['O', 'o'])
}

/// Strips the line terminator a client may leave on its input.
pub fn strip_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
