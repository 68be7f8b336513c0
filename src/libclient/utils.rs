use crate::libclient::state::Outcome;
use crate::libserver::messages::*;
use crate::libserver::utils::Choice;

/// A server line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    Slot(u8),
    Started,
    ChoicePrompt,
    Invalid,
    Outcome(Outcome, [Choice; 2]),
    Score(u32, u32),
    ContinuePrompt,
    OpponentLeft,
    OpponentDisconnected,
    Goodbye,
    Other(String),
}

pub fn parse_line(line: &str) -> ServerLine {
    let parsed = match line {
        GAME_STARTS => Some(ServerLine::Started),
        CHOICE_PROMPT => Some(ServerLine::ChoicePrompt),
        INVALID_CHOICE => Some(ServerLine::Invalid),
        CONTINUE_PROMPT => Some(ServerLine::ContinuePrompt),
        OPPONENT_DECLINED => Some(ServerLine::OpponentLeft),
        OPPONENT_DISCONNECTED => Some(ServerLine::OpponentDisconnected),
        GOODBYE => Some(ServerLine::Goodbye),
        _ => parse_slot(line)
            .or_else(|| parse_outcome(line))
            .or_else(|| parse_score(line)),
    };
    parsed.unwrap_or_else(|| ServerLine::Other(line.to_string()))
}

fn parse_slot(line: &str) -> Option<ServerLine> {
    let number = line.strip_prefix(SLOT)?.trim().parse().ok()?;
    Some(ServerLine::Slot(number))
}

/// `<status> Joueur1: <choice> vs Joueur2: <choice>`
fn parse_outcome(line: &str) -> Option<ServerLine> {
    let (outcome, rest) = [(WON, Outcome::Won), (LOST, Outcome::Lost), (TIE, Outcome::Tie)]
        .into_iter()
        .find_map(|(status, outcome)| line.strip_prefix(status).map(|rest| (outcome, rest)))?;
    let rest = rest.trim().strip_prefix("Joueur1:")?;
    let (first, second) = rest.split_once(" vs Joueur2:")?;
    let choices = [first.trim().parse().ok()?, second.trim().parse().ok()?];
    Some(ServerLine::Outcome(outcome, choices))
}

/// `Score: <mine> - <theirs>`
fn parse_score(line: &str) -> Option<ServerLine> {
    let (mine, theirs) = line.strip_prefix(SCORE)?.split_once('-')?;
    Some(ServerLine::Score(
        mine.trim().parse().ok()?,
        theirs.trim().parse().ok()?,
    ))
}
