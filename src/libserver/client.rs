use crate::libserver::utils::{Choice, Outcome};
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};
use std::fmt;

/// Lines queued for a player by the other side of the match.
pub type Tx = UnboundedSender<String>;
pub type Inbox = UnboundedReceiver<String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }

    pub fn other(self) -> PlayerSlot {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    fn from_index(index: usize) -> PlayerSlot {
        if index == 0 {
            PlayerSlot::One
        } else {
            PlayerSlot::Two
        }
    }

    pub fn both() -> [PlayerSlot; 2] {
        [PlayerSlot::One, PlayerSlot::Two]
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.number())
    }
}

/// A value recorded for a specific round. Predicates compare the tag, never
/// just presence, so a leftover value can't satisfy a later round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tagged<T> {
    pub round: u32,
    pub value: T,
}

impl<T: Copy> Tagged<T> {
    pub fn new(round: u32, value: T) -> Self {
        Tagged { round, value }
    }

    pub fn for_round(slot: &Option<Tagged<T>>, round: u32) -> Option<T> {
        slot.filter(|t| t.round == round).map(|t| t.value)
    }
}

pub struct Client {
    pub tx: Tx,
    pub selected: Option<Tagged<Choice>>,
    pub vote: Option<Tagged<bool>>,
}

impl Client {
    pub fn new(tx: Tx) -> Client {
        Client {
            tx,
            selected: None,
            vote: None,
        }
    }

    /// Queues a line for this player. Returns false once the player's session
    /// has gone away.
    pub fn send_msg(&self, msg: String) -> bool {
        self.tx.unbounded_send(msg).is_ok()
    }

    pub fn reset(&mut self) {
        self.selected = None;
        self.vote = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// `by[i]` is true when slot `i + 1` voted to stop.
    Declined { by: [bool; 2] },
    Disconnected(PlayerSlot),
}

impl EndReason {
    pub fn declined_by(&self, slot: PlayerSlot) -> bool {
        match self {
            EndReason::Declined { by } => by[slot.index()],
            EndReason::Disconnected(_) => false,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Declined { by } => {
                let quitters: Vec<String> = by
                    .iter()
                    .enumerate()
                    .filter(|(_, declined)| **declined)
                    .map(|(i, _)| PlayerSlot::from_index(i).to_string())
                    .collect();
                write!(f, "{} declined to continue", quitters.join(" and "))
            }
            EndReason::Disconnected(slot) => write!(f, "{} disconnected", slot),
        }
    }
}

/// What both players receive once a round is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundResult {
    pub round: u32,
    pub choices: [Choice; 2],
    pub outcome: Outcome,
    pub scores: [u32; 2],
}

/// A round result seen from one player's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Won,
    Lost,
    Tie,
}

impl RoundResult {
    pub fn verdict(&self, slot: PlayerSlot) -> Verdict {
        match (self.outcome, slot) {
            (Outcome::Draw, _) => Verdict::Tie,
            (Outcome::Player1Wins, PlayerSlot::One) | (Outcome::Player2Wins, PlayerSlot::Two) => {
                Verdict::Won
            }
            _ => Verdict::Lost,
        }
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        match self.outcome {
            Outcome::Draw => None,
            Outcome::Player1Wins => Some(PlayerSlot::One),
            Outcome::Player2Wins => Some(PlayerSlot::Two),
        }
    }

    pub fn score_of(&self, slot: PlayerSlot) -> u32 {
        self.scores[slot.index()]
    }
}
