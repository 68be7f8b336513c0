//! Shared state of one two-player match and the rendezvous points both
//! sessions meet at.
//!
//! Every field lives behind one mutex. Waiters register with `changed` before
//! they look at the state, so a wake-up sent between the check and the
//! suspension is not lost. Every mutation ends with `notify_waiters`.

use crate::libserver::client::{Client, EndReason, Inbox, PlayerSlot, RoundResult, Tagged};
use crate::libserver::error::MatchError;
use crate::libserver::utils::{resolve, Choice};
use futures_channel::mpsc::unbounded;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    WaitingForPlayers,
    AwaitingChoices,
    Resolving,
    AwaitingContinue,
    Finished,
}

impl Lifecycle {
    fn can_become(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        match (self, next) {
            (Finished, _) => false,
            (_, Finished) => true,
            (WaitingForPlayers, AwaitingChoices)
            | (AwaitingChoices, Resolving)
            | (Resolving, AwaitingContinue)
            | (AwaitingContinue, AwaitingChoices) => true,
            _ => false,
        }
    }
}

pub struct Clients {
    pub p1: Option<Client>,
    pub p2: Option<Client>,
    pub lifecycle: Lifecycle,
    pub round: u32,
    pub scores: [u32; 2],
    pub last: Option<RoundResult>,
    pub end: Option<EndReason>,
}

impl Clients {
    fn new() -> Clients {
        Clients {
            p1: None,
            p2: None,
            lifecycle: Lifecycle::WaitingForPlayers,
            round: 0,
            scores: [0, 0],
            last: None,
            end: None,
        }
    }

    fn get(&self, slot: PlayerSlot) -> Option<&Client> {
        match slot {
            PlayerSlot::One => self.p1.as_ref(),
            PlayerSlot::Two => self.p2.as_ref(),
        }
    }

    fn get_mut(&mut self, slot: PlayerSlot) -> Option<&mut Client> {
        match slot {
            PlayerSlot::One => self.p1.as_mut(),
            PlayerSlot::Two => self.p2.as_mut(),
        }
    }

    fn both_present(&self) -> bool {
        self.p1.is_some() && self.p2.is_some()
    }

    /// Both choices, only if both carry the `round` tag.
    pub fn get_selected(&self, round: u32) -> Option<[Choice; 2]> {
        let p1 = Tagged::for_round(&self.p1.as_ref()?.selected, round)?;
        let p2 = Tagged::for_round(&self.p2.as_ref()?.selected, round)?;
        Some([p1, p2])
    }

    fn get_votes(&self, round: u32) -> Option<[bool; 2]> {
        let p1 = Tagged::for_round(&self.p1.as_ref()?.vote, round)?;
        let p2 = Tagged::for_round(&self.p2.as_ref()?.vote, round)?;
        Some([p1, p2])
    }

    fn has_chosen(&self, slot: PlayerSlot, round: u32) -> bool {
        self.get(slot)
            .and_then(|c| Tagged::for_round(&c.selected, round))
            .is_some()
    }

    fn transition(&mut self, id: u64, next: Lifecycle) {
        if !self.lifecycle.can_become(next) {
            log::error!(
                "match {}: illegal transition {:?} -> {:?}",
                id,
                self.lifecycle,
                next
            );
            debug_assert!(false, "illegal transition {:?} -> {:?}", self.lifecycle, next);
        }
        log::debug!("match {}: {:?} -> {:?}", id, self.lifecycle, next);
        self.lifecycle = next;
    }

    fn ended(&self) -> Result<(), MatchError> {
        match self.end {
            Some(reason) => Err(MatchError::Ended(reason)),
            None => Ok(()),
        }
    }

    fn resolve_round(&mut self, id: u64, choices: [Choice; 2]) -> RoundResult {
        self.transition(id, Lifecycle::Resolving);
        let outcome = resolve(choices[0], choices[1]);
        let mut result = RoundResult {
            round: self.round,
            choices,
            outcome,
            scores: self.scores,
        };
        if let Some(winner) = result.winner() {
            self.scores[winner.index()] += 1;
            result.scores = self.scores;
        }
        log::info!(
            "match {}: round {} {} vs {} -> {:?}, score {}-{}",
            id,
            result.round,
            choices[0],
            choices[1],
            outcome,
            result.scores[0],
            result.scores[1]
        );
        self.last = Some(result);
        self.transition(id, Lifecycle::AwaitingContinue);
        result
    }

    fn next_round(&mut self, id: u64) {
        for slot in PlayerSlot::both() {
            if let Some(client) = self.get_mut(slot) {
                client.reset();
            }
        }
        self.round += 1;
        self.transition(id, Lifecycle::AwaitingChoices);
    }

    fn finish(&mut self, id: u64, reason: EndReason) {
        if self.end.is_none() {
            log::info!("match {}: finished, {}", id, reason);
            self.end = Some(reason);
            self.transition(id, Lifecycle::Finished);
        }
    }
}

/// One match between two players, shared by both sessions.
pub struct Match {
    id: u64,
    state: Mutex<Clients>,
    changed: Notify,
}

impl Match {
    pub fn new(id: u64) -> Match {
        Match {
            id,
            state: Mutex::new(Clients::new()),
            changed: Notify::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Clients> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `check` under the lock until it yields a value. Re-evaluated after
    /// every wake-up, spurious or not.
    async fn wait_until<T>(&self, mut check: impl FnMut(&mut Clients) -> Option<T>) -> T {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if let Some(value) = check(&mut *state) {
                    drop(state);
                    self.changed.notify_waiters();
                    return value;
                }
            }
            notified.await;
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().lifecycle
    }

    pub fn round(&self) -> u32 {
        self.lock().round
    }

    pub fn scores(&self) -> [u32; 2] {
        self.lock().scores
    }

    pub fn is_finished(&self) -> bool {
        self.lock().lifecycle == Lifecycle::Finished
    }

    /// Takes the next free seat without waiting. Returns the slot and the
    /// inbox that receives lines queued for this player.
    pub fn join(&self) -> Result<(PlayerSlot, Inbox), MatchError> {
        let mut state = self.lock();
        state.ended()?;
        let (tx, rx) = unbounded();
        let slot = if state.p1.is_none() {
            state.p1 = Some(Client::new(tx));
            PlayerSlot::One
        } else if state.p2.is_none() {
            state.p2 = Some(Client::new(tx));
            PlayerSlot::Two
        } else {
            return Err(MatchError::Full);
        };
        log::debug!("match {}: {} seated", self.id, slot);
        if state.both_present() {
            state.transition(self.id, Lifecycle::AwaitingChoices);
        }
        drop(state);
        self.changed.notify_waiters();
        Ok((slot, rx))
    }

    /// Suspends until both seats are taken.
    pub async fn wait_for_opponent(
        self: &Arc<Self>,
        slot: PlayerSlot,
    ) -> Result<Opponent, MatchError> {
        let game = Arc::clone(self);
        self.wait_until(|state| {
            if let Err(e) = state.ended() {
                return Some(Err(e));
            }
            state.both_present().then(|| {
                Ok(Opponent {
                    slot: slot.other(),
                    game: Arc::clone(&game),
                })
            })
        })
        .await
    }

    /// `join` followed by `wait_for_opponent`.
    pub async fn register_player(
        self: &Arc<Self>,
    ) -> Result<(PlayerSlot, Opponent, Inbox), MatchError> {
        let (slot, inbox) = self.join()?;
        let opponent = self.wait_for_opponent(slot).await?;
        Ok((slot, opponent, inbox))
    }

    /// Records `choice` for `round` without waiting.
    pub fn record_choice(
        &self,
        slot: PlayerSlot,
        round: u32,
        choice: Choice,
    ) -> Result<(), MatchError> {
        {
            let mut state = self.lock();
            state.ended()?;
            if state.round != round {
                return Err(MatchError::WrongRound {
                    current: state.round,
                    requested: round,
                });
            }
            if state.lifecycle != Lifecycle::AwaitingChoices {
                return Err(MatchError::NotAcceptingChoices);
            }
            if state.has_chosen(slot, round) {
                return Err(MatchError::AlreadyChose { slot, round });
            }
            match state.get_mut(slot) {
                Some(client) => client.selected = Some(Tagged::new(round, choice)),
                None => return Err(MatchError::NotAcceptingChoices),
            }
            log::debug!("match {}: {} chose {} in round {}", self.id, slot, choice, round);
        }
        self.changed.notify_waiters();
        Ok(())
    }

    /// Suspends until both choices for `round` are in. Whichever caller first
    /// sees both choices resolves the round; the other gets the published
    /// result.
    pub async fn round_result(&self, round: u32) -> Result<RoundResult, MatchError> {
        let id = self.id;
        self.wait_until(|state| {
            if let Some(result) = state.last.filter(|r| r.round == round) {
                return Some(Ok(result));
            }
            if let Err(e) = state.ended() {
                return Some(Err(e));
            }
            let choices = state.get_selected(round)?;
            Some(Ok(state.resolve_round(id, choices)))
        })
        .await
    }

    /// `record_choice` followed by `round_result`.
    pub async fn submit_choice(
        &self,
        slot: PlayerSlot,
        round: u32,
        choice: Choice,
    ) -> Result<RoundResult, MatchError> {
        self.record_choice(slot, round, choice)?;
        self.round_result(round).await
    }

    /// Records a continue vote and suspends until both players voted.
    /// Returns the number of the next round, or `Ended` if either declined.
    pub async fn record_continue_vote(
        &self,
        slot: PlayerSlot,
        wants_continue: bool,
    ) -> Result<u32, MatchError> {
        let round = {
            let mut state = self.lock();
            state.ended()?;
            if state.lifecycle != Lifecycle::AwaitingContinue {
                return Err(MatchError::NotVoting);
            }
            let round = state.round;
            match state.get_mut(slot) {
                Some(client) if client.vote.is_some() => {
                    return Err(MatchError::AlreadyVoted { slot, round });
                }
                Some(client) => client.vote = Some(Tagged::new(round, wants_continue)),
                None => return Err(MatchError::NotVoting),
            }
            log::debug!(
                "match {}: {} votes {} after round {}",
                self.id,
                slot,
                if wants_continue { "continue" } else { "stop" },
                round
            );
            round
        };
        self.changed.notify_waiters();

        let id = self.id;
        self.wait_until(|state| {
            if state.round > round {
                return Some(Ok(state.round));
            }
            if let Err(e) = state.ended() {
                return Some(Err(e));
            }
            let votes = state.get_votes(round)?;
            if votes == [true, true] {
                state.next_round(id);
                Some(Ok(state.round))
            } else {
                let reason = EndReason::Declined {
                    by: [!votes[0], !votes[1]],
                };
                state.finish(id, reason);
                Some(Err(MatchError::Ended(reason)))
            }
        })
        .await
    }

    /// Suspends until the match is over.
    pub async fn closed(&self) -> EndReason {
        self.wait_until(|state| state.end).await
    }

    /// Ends the match because `slot` lost its connection and releases every
    /// suspended caller.
    pub fn notify_disconnected(&self, slot: PlayerSlot) {
        self.lock().finish(self.id, EndReason::Disconnected(slot));
        self.changed.notify_waiters();
    }

    fn notify(&self, slot: PlayerSlot, msg: String) -> bool {
        self.lock()
            .get(slot)
            .map(|client| client.send_msg(msg))
            .unwrap_or(false)
    }
}

/// Handle on the other player of a match.
#[derive(Clone)]
pub struct Opponent {
    slot: PlayerSlot,
    game: Arc<Match>,
}

impl Opponent {
    pub fn slot(&self) -> PlayerSlot {
        self.slot
    }

    pub fn score(&self) -> u32 {
        self.game.scores()[self.slot.index()]
    }

    pub fn has_chosen(&self, round: u32) -> bool {
        self.game.lock().has_chosen(self.slot, round)
    }

    /// Queues `msg` for the opponent's session.
    pub fn notify(&self, msg: impl Into<String>) -> bool {
        self.game.notify(self.slot, msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libserver::utils::Outcome;
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio::time::timeout;

    const BLOCKED: Duration = Duration::from_millis(50);
    const GENEROUS: Duration = Duration::from_secs(5);

    async fn seated() -> Arc<Match> {
        let game = Arc::new(Match::new(1));
        let (first, _) = game.join().unwrap();
        let (second, _) = game.join().unwrap();
        assert_eq!((first, second), (PlayerSlot::One, PlayerSlot::Two));
        game
    }

    async fn play_round(game: &Arc<Match>, p1: Choice, p2: Choice) -> RoundResult {
        let round = game.round();
        let g = Arc::clone(game);
        let first = tokio::spawn(async move { g.submit_choice(PlayerSlot::One, round, p1).await });
        let second = game.submit_choice(PlayerSlot::Two, round, p2).await.unwrap();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, second);
        first
    }

    async fn vote(game: &Arc<Match>, p1: bool, p2: bool) -> [Result<u32, MatchError>; 2] {
        let g = Arc::clone(game);
        let first = tokio::spawn(async move { g.record_continue_vote(PlayerSlot::One, p1).await });
        let second = game.record_continue_vote(PlayerSlot::Two, p2).await;
        [first.await.unwrap(), second]
    }

    #[tokio::test]
    async fn test_register_waits_for_both_players() {
        let game = Arc::new(Match::new(1));
        let g = Arc::clone(&game);
        let first = tokio::spawn(async move { g.register_player().await });

        tokio::time::sleep(BLOCKED).await;
        assert!(!first.is_finished());
        assert_eq!(game.lifecycle(), Lifecycle::WaitingForPlayers);

        let (slot, opponent, _inbox) = game.register_player().await.unwrap();
        assert_eq!(slot, PlayerSlot::Two);
        assert_eq!(opponent.slot(), PlayerSlot::One);

        let (slot, opponent, _inbox) = timeout(GENEROUS, first).await.unwrap().unwrap().unwrap();
        assert_eq!(slot, PlayerSlot::One);
        assert_eq!(opponent.slot(), PlayerSlot::Two);
        assert_eq!(game.lifecycle(), Lifecycle::AwaitingChoices);
    }

    #[tokio::test]
    async fn test_third_player_is_refused() {
        let game = seated().await;
        assert_eq!(game.join().err(), Some(MatchError::Full));
    }

    #[tokio::test]
    async fn test_submit_blocks_until_other_submits() {
        let game = seated().await;
        let g = Arc::clone(&game);
        let mut first =
            tokio::spawn(async move { g.submit_choice(PlayerSlot::One, 0, Choice::Rock).await });

        assert!(timeout(BLOCKED, &mut first).await.is_err());
        assert_eq!(game.lifecycle(), Lifecycle::AwaitingChoices);

        let second = game
            .submit_choice(PlayerSlot::Two, 0, Choice::Scissors)
            .await
            .unwrap();
        let first = timeout(GENEROUS, first).await.unwrap().unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.outcome, Outcome::Player1Wins);
        assert_eq!(first.scores, [1, 0]);
        assert_eq!(game.lifecycle(), Lifecycle::AwaitingContinue);
    }

    #[tokio::test]
    async fn test_consumed_choice_does_not_satisfy_next_round() {
        let game = seated().await;
        play_round(&game, Choice::Rock, Choice::Paper).await;
        assert_eq!(vote(&game, true, true).await, [Ok(1), Ok(1)]);

        let g = Arc::clone(&game);
        let mut second =
            tokio::spawn(async move { g.submit_choice(PlayerSlot::Two, 1, Choice::Rock).await });
        assert!(timeout(BLOCKED, &mut second).await.is_err());
        assert_eq!(game.round(), 1);
        assert_eq!(game.lifecycle(), Lifecycle::AwaitingChoices);

        game.notify_disconnected(PlayerSlot::One);
        let ended = timeout(GENEROUS, second).await.unwrap().unwrap();
        assert_eq!(
            ended,
            Err(MatchError::Ended(EndReason::Disconnected(PlayerSlot::One)))
        );
    }

    #[tokio::test]
    async fn test_stale_tag_never_matches_later_round() {
        let game = seated().await;
        let mut state = game.lock();
        state.round = 1;
        state.p1.as_mut().unwrap().selected = Some(Tagged::new(0, Choice::Rock));
        state.p2.as_mut().unwrap().selected = Some(Tagged::new(1, Choice::Paper));
        assert_eq!(state.get_selected(1), None);
        assert_eq!(state.get_selected(0), None);
    }

    #[tokio::test]
    async fn test_out_of_order_submissions_are_rejected() {
        let game = seated().await;
        assert_eq!(
            game.submit_choice(PlayerSlot::One, 3, Choice::Rock).await,
            Err(MatchError::WrongRound {
                current: 0,
                requested: 3
            })
        );

        let g = Arc::clone(&game);
        let pending =
            tokio::spawn(async move { g.submit_choice(PlayerSlot::One, 0, Choice::Rock).await });
        tokio::time::sleep(BLOCKED).await;
        assert_eq!(
            game.submit_choice(PlayerSlot::One, 0, Choice::Paper).await,
            Err(MatchError::AlreadyChose {
                slot: PlayerSlot::One,
                round: 0
            })
        );
        assert_eq!(
            game.record_continue_vote(PlayerSlot::Two, true).await,
            Err(MatchError::NotVoting)
        );
        pending.abort();
    }

    #[tokio::test]
    async fn test_disconnect_releases_waiting_submitter() {
        let game = seated().await;
        let g = Arc::clone(&game);
        let mut second =
            tokio::spawn(async move { g.submit_choice(PlayerSlot::Two, 0, Choice::Paper).await });
        assert!(timeout(BLOCKED, &mut second).await.is_err());

        game.notify_disconnected(PlayerSlot::One);
        let result = timeout(GENEROUS, second).await.unwrap().unwrap();
        assert_eq!(
            result,
            Err(MatchError::Ended(EndReason::Disconnected(PlayerSlot::One)))
        );
        assert!(game.is_finished());

        game.notify_disconnected(PlayerSlot::Two);
        assert_eq!(
            game.submit_choice(PlayerSlot::Two, 0, Choice::Rock).await,
            Err(MatchError::Ended(EndReason::Disconnected(PlayerSlot::One)))
        );
    }

    #[tokio::test]
    async fn test_disconnect_releases_waiting_registrant_and_voter() {
        let lonely = Arc::new(Match::new(2));
        let (slot, _) = lonely.join().unwrap();
        let l = Arc::clone(&lonely);
        let waiting = tokio::spawn(async move { l.wait_for_opponent(slot).await.map(|_| ()) });
        tokio::time::sleep(BLOCKED).await;
        lonely.notify_disconnected(PlayerSlot::One);
        assert!(timeout(GENEROUS, waiting).await.unwrap().unwrap().is_err());
        assert_eq!(
            lonely.join().err(),
            Some(MatchError::Ended(EndReason::Disconnected(PlayerSlot::One)))
        );

        let game = seated().await;
        play_round(&game, Choice::Rock, Choice::Rock).await;
        let g = Arc::clone(&game);
        let voter =
            tokio::spawn(async move { g.record_continue_vote(PlayerSlot::One, true).await });
        tokio::time::sleep(BLOCKED).await;
        game.notify_disconnected(PlayerSlot::Two);
        assert_eq!(
            timeout(GENEROUS, voter).await.unwrap().unwrap(),
            Err(MatchError::Ended(EndReason::Disconnected(PlayerSlot::Two)))
        );
    }

    #[tokio::test]
    async fn test_continue_requires_both_votes() {
        let game = seated().await;
        play_round(&game, Choice::Paper, Choice::Scissors).await;

        let g = Arc::clone(&game);
        let mut first =
            tokio::spawn(async move { g.record_continue_vote(PlayerSlot::One, true).await });
        assert!(timeout(BLOCKED, &mut first).await.is_err());

        assert_eq!(game.record_continue_vote(PlayerSlot::Two, true).await, Ok(1));
        assert_eq!(timeout(GENEROUS, first).await.unwrap().unwrap(), Ok(1));
        assert_eq!(game.round(), 1);
        assert_eq!(game.lifecycle(), Lifecycle::AwaitingChoices);

        let state = game.lock();
        assert!(state.p1.as_ref().unwrap().selected.is_none());
        assert!(state.p2.as_ref().unwrap().selected.is_none());
    }

    #[tokio::test]
    async fn test_either_decline_finishes_match() {
        let game = seated().await;
        play_round(&game, Choice::Paper, Choice::Rock).await;
        let reason = EndReason::Declined { by: [false, true] };
        assert_eq!(
            vote(&game, true, false).await,
            [Err(MatchError::Ended(reason)), Err(MatchError::Ended(reason))]
        );
        assert!(game.is_finished());
        assert_eq!(game.scores(), [1, 0]);
    }

    #[tokio::test]
    async fn test_scores_only_grow_for_winner() {
        let game = seated().await;
        let rounds = [
            (Choice::Rock, Choice::Scissors),
            (Choice::Rock, Choice::Rock),
            (Choice::Rock, Choice::Paper),
            (Choice::Scissors, Choice::Paper),
            (Choice::Paper, Choice::Scissors),
        ];
        let mut previous = [0, 0];
        for (round, (p1, p2)) in rounds.into_iter().enumerate() {
            let result = play_round(&game, p1, p2).await;
            assert_eq!(result.round, round as u32);
            for slot in PlayerSlot::both() {
                let i = slot.index();
                let expected = previous[i] + u32::from(result.winner() == Some(slot));
                assert_eq!(result.scores[i], expected);
            }
            previous = result.scores;
            assert_eq!(vote(&game, true, true).await, [Ok(round as u32 + 1); 2]);
        }
        assert_eq!(game.scores(), [2, 2]);
    }

    #[tokio::test]
    async fn test_rejected_choice_is_not_recorded() {
        let game = seated().await;
        game.notify_disconnected(PlayerSlot::Two);
        assert_eq!(
            game.record_choice(PlayerSlot::One, 0, Choice::Rock),
            Err(MatchError::Ended(EndReason::Disconnected(PlayerSlot::Two)))
        );
        assert!(!game.lock().has_chosen(PlayerSlot::One, 0));
    }

    #[tokio::test]
    async fn test_closed_waits_for_end() {
        let game = seated().await;
        let g = Arc::clone(&game);
        let mut closed = tokio::spawn(async move { g.closed().await });
        assert!(timeout(BLOCKED, &mut closed).await.is_err());

        play_round(&game, Choice::Rock, Choice::Paper).await;
        assert!(timeout(BLOCKED, &mut closed).await.is_err());

        game.notify_disconnected(PlayerSlot::One);
        assert_eq!(
            timeout(GENEROUS, closed).await.unwrap().unwrap(),
            EndReason::Disconnected(PlayerSlot::One)
        );
        assert_eq!(game.closed().await, EndReason::Disconnected(PlayerSlot::One));
    }

    #[tokio::test]
    async fn test_opponent_handle() {
        let game = Arc::new(Match::new(1));
        let (_, mut inbox_one) = game.join().unwrap();
        let (_, _inbox_two) = game.join().unwrap();
        let opponent_of_two = game.wait_for_opponent(PlayerSlot::Two).await.unwrap();
        assert_eq!(opponent_of_two.slot(), PlayerSlot::One);

        let g = Arc::clone(&game);
        let pending =
            tokio::spawn(async move { g.submit_choice(PlayerSlot::One, 0, Choice::Rock).await });
        tokio::time::sleep(BLOCKED).await;
        assert!(opponent_of_two.has_chosen(0));
        assert!(!opponent_of_two.has_chosen(1));

        assert!(opponent_of_two.notify("hello"));
        assert_eq!(inbox_one.next().await.as_deref(), Some("hello"));

        game.submit_choice(PlayerSlot::Two, 0, Choice::Paper).await.unwrap();
        pending.await.unwrap().unwrap();
        assert_eq!(opponent_of_two.score(), 0);
    }
}
