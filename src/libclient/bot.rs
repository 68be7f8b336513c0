use crate::libclient::state::Game;
use crate::libclient::utils::ServerLine;
use crate::libserver::utils::CHOICES;
use rand::{seq::SliceRandom, Rng};

/// Plays random choices for a fixed number of rounds.
pub struct Bot {
    pub rounds: u32,
}

impl Bot {
    pub fn answer<R: Rng>(&self, line: &ServerLine, game: &Game, rng: &mut R) -> Option<String> {
        match line {
            ServerLine::ChoicePrompt => CHOICES.choose(rng).map(|c| c.token().to_string()),
            ServerLine::ContinuePrompt if game.rounds < self.rounds => Some("O".to_string()),
            ServerLine::ContinuePrompt => Some("N".to_string()),
            _ => None,
        }
    }
}
