use crate::libserver::client::{EndReason, Inbox, PlayerSlot};
use crate::libserver::clients::Match;
use crate::libserver::connection::Connection;
use crate::libserver::error::{ConnectionError, MatchError, SessionError};
use crate::libserver::messages::{self, *};
use crate::libserver::utils::{parse_vote, Choice};
use futures_util::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Drives one player through a match. Owns the player's connection and
/// closes it on every way out of [`Session::run`].
pub struct Session<C> {
    conn: C,
    game: Arc<Match>,
    slot: PlayerSlot,
    inbox: Inbox,
    idle_timeout: Option<Duration>,
}

impl<C: Connection> Session<C> {
    pub fn new(
        conn: C,
        game: Arc<Match>,
        slot: PlayerSlot,
        inbox: Inbox,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Session {
            conn,
            game,
            slot,
            inbox,
            idle_timeout,
        }
    }

    pub async fn run(mut self) -> Result<EndReason, SessionError> {
        let outcome = self.play().await;
        match &outcome {
            Ok(reason) => log::info!("match {}: {} done, {}", self.game.id(), self.slot, reason),
            Err(SessionError::PeerLost(e)) => {
                log::warn!("match {}: {} lost: {}", self.game.id(), self.slot, e);
                self.game.notify_disconnected(self.slot);
            }
            Err(SessionError::Match(e)) => {
                log::error!("match {}: {} dropped: {}", self.game.id(), self.slot, e);
                self.game.notify_disconnected(self.slot);
            }
        }
        self.conn.close().await;
        outcome
    }

    /// Plays until the match ends, then sends the closing lines.
    async fn play(&mut self) -> Result<EndReason, SessionError> {
        match self.rounds().await {
            Err(SessionError::Match(MatchError::Ended(reason))) => self.farewell(reason).await,
            other => other,
        }
    }

    async fn rounds(&mut self) -> Result<EndReason, SessionError> {
        let game = Arc::clone(&self.game);
        let slot = self.slot;

        self.send(WELCOME).await?;
        self.send(&messages::slot(slot)).await?;
        if slot == PlayerSlot::One {
            self.send(WAITING_FOR_PLAYER).await?;
        }
        let opponent = self.suspend(game.wait_for_opponent(slot)).await??;
        self.send(GAME_STARTS).await?;
        self.send(CHOICES).await?;

        loop {
            let round = game.round();
            let choice = self.read_choice().await?;
            game.record_choice(slot, round, choice)?;
            if !opponent.has_chosen(round) {
                opponent.notify(OPPONENT_CHOSE);
                self.send(WAITING_FOR_OPPONENT).await?;
            }
            let result = self.suspend(game.round_result(round)).await??;
            self.send(&messages::outcome(&result, slot)).await?;
            self.send(&messages::score(&result, slot)).await?;

            self.send(CONTINUE_PROMPT).await?;
            let wants_continue = parse_vote(&self.read_line().await?);
            let next = self
                .suspend(game.record_continue_vote(slot, wants_continue))
                .await??;
            log::debug!("match {}: {} moves to round {}", game.id(), slot, next);
        }
    }

    async fn farewell(&mut self, reason: EndReason) -> Result<EndReason, SessionError> {
        match reason {
            EndReason::Disconnected(who) if who != self.slot => {
                self.send(OPPONENT_DISCONNECTED).await?
            }
            EndReason::Declined { .. } if !reason.declined_by(self.slot) => {
                self.send(OPPONENT_DECLINED).await?
            }
            _ => {}
        }
        self.send(GOODBYE).await?;
        Ok(reason)
    }

    async fn read_choice(&mut self) -> Result<Choice, SessionError> {
        loop {
            self.send(CHOICE_PROMPT).await?;
            let line = self.read_line().await?;
            match line.parse::<Choice>() {
                Ok(choice) => return Ok(choice),
                Err(e) => {
                    log::debug!("match {}: {}: {}", self.game.id(), self.slot, e);
                    self.send(INVALID_CHOICE).await?;
                }
            }
        }
    }

    /// Next line from the player, forwarding queued notices meanwhile. Gives
    /// up with `Ended` as soon as the match is over.
    async fn read_line(&mut self) -> Result<String, SessionError> {
        let deadline = self.idle_timeout.map(|timeout| Instant::now() + timeout);
        loop {
            tokio::select! {
                line = self.conn.receive_line() => return Ok(line?),
                Some(notice) = self.inbox.next() => self.conn.send_line(&notice).await?,
                reason = self.game.closed() => return Err(MatchError::Ended(reason).into()),
                _ = idle(deadline) => return Err(ConnectionError::TimedOut.into()),
            }
        }
    }

    /// Awaits a match operation while still serving the connection: notices
    /// are forwarded, early input is answered with a wait message, and a
    /// dropped connection ends the wait.
    async fn suspend<T>(
        &mut self,
        wait: impl Future<Output = Result<T, MatchError>>,
    ) -> Result<Result<T, MatchError>, SessionError> {
        tokio::pin!(wait);
        loop {
            tokio::select! {
                biased;
                outcome = &mut wait => return Ok(outcome),
                Some(notice) = self.inbox.next() => self.conn.send_line(&notice).await?,
                line = self.conn.receive_line() => {
                    let line = line?;
                    log::debug!("match {}: {} sent {:?} while waiting", self.game.id(), self.slot, line);
                    self.conn.send_line(WAITING_FOR_OPPONENT).await?;
                }
            }
        }
    }

    async fn send(&mut self, line: &str) -> Result<(), SessionError> {
        Ok(self.conn.send_line(line).await?)
    }
}

async fn idle(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
