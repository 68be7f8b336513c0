use crate::libclient::utils::ServerLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    WaitingForOpponent,
    Choosing,
    WaitingForOtherSelected,
    Deciding,
    Over,
}

/// What the client knows about its own match.
#[derive(Debug)]
pub struct Game {
    pub state: GameState,
    pub slot: Option<u8>,
    pub scores: (u32, u32),
    pub rounds: u32,
    pub last: Option<Outcome>,
}

impl Default for Game {
    fn default() -> Self {
        Game {
            state: GameState::WaitingForOpponent,
            slot: None,
            scores: (0, 0),
            rounds: 0,
            last: None,
        }
    }
}

impl Game {
    pub fn observe(&mut self, line: &ServerLine) {
        match line {
            ServerLine::Slot(slot) => self.slot = Some(*slot),
            ServerLine::ChoicePrompt => self.state = GameState::Choosing,
            ServerLine::Outcome(outcome, _) => {
                self.rounds += 1;
                self.last = Some(*outcome);
            }
            ServerLine::Score(mine, theirs) => self.scores = (*mine, *theirs),
            ServerLine::ContinuePrompt => self.state = GameState::Deciding,
            ServerLine::Goodbye => self.state = GameState::Over,
            _ => (),
        }
    }

    /// Call after sending an answer to the current prompt.
    pub fn answered(&mut self) {
        if self.state == GameState::Choosing {
            self.state = GameState::WaitingForOtherSelected;
        } else if self.state == GameState::Deciding {
            self.state = GameState::WaitingForOpponent;
        }
    }
}
