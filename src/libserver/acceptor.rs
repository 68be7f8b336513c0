//! Accepts connections until two clients are paired, hands the pair a fresh
//! match, and keeps going with the next pair.

use crate::libserver::client::{EndReason, Inbox, PlayerSlot};
use crate::libserver::clients::Match;
use crate::libserver::connection::Listener;
use crate::libserver::error::{MatchError, SessionError};
use crate::libserver::session::Session;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub struct Acceptor<L> {
    listener: L,
    idle_timeout: Option<Duration>,
    max_matches: Option<usize>,
    sessions: JoinSet<Result<EndReason, SessionError>>,
}

impl<L: Listener> Acceptor<L> {
    pub fn new(listener: L) -> Self {
        Acceptor {
            listener,
            idle_timeout: None,
            max_matches: None,
            sessions: JoinSet::new(),
        }
    }

    pub fn idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Stop accepting once this many pairs have been seated.
    pub fn max_matches(mut self, max_matches: Option<usize>) -> Self {
        self.max_matches = max_matches;
        self
    }

    /// Serves until the match limit is reached, then waits for every session
    /// to finish. A failing listener aborts with an error.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut pending: Option<Arc<Match>> = None;
        let mut next_id = 1;
        let mut paired = 0;

        while self.max_matches.map_or(true, |max| paired < max) {
            let conn = self
                .listener
                .accept()
                .await
                .context("failed to accept connection")?;

            let (game, slot, inbox) = self.seat(&mut pending, &mut next_id)?;
            log::info!("match {}: connection seated as {}", game.id(), slot);

            let session = Session::new(conn, Arc::clone(&game), slot, inbox, self.idle_timeout);
            self.sessions.spawn(session.run());

            if slot == PlayerSlot::One {
                pending = Some(game);
            } else {
                paired += 1;
                log::info!("match {}: both players connected", game.id());
            }
            self.reap();
        }

        log::info!("match limit reached, waiting for running sessions");
        while let Some(joined) = self.sessions.join_next().await {
            report(joined);
        }
        Ok(())
    }

    /// Joins the pending match, or a new one if there is none or its first
    /// player already left.
    fn seat(
        &self,
        pending: &mut Option<Arc<Match>>,
        next_id: &mut u64,
    ) -> anyhow::Result<(Arc<Match>, PlayerSlot, Inbox)> {
        loop {
            let game = match pending.take() {
                Some(game) => game,
                None => self.new_match(next_id),
            };
            match game.join() {
                Ok((slot, inbox)) => return Ok((game, slot, inbox)),
                Err(MatchError::Ended(reason)) => {
                    log::info!("match {}: abandoned before it started, {}", game.id(), reason);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("match {} refused a player", game.id()))
                }
            }
        }
    }

    fn new_match(&self, next_id: &mut u64) -> Arc<Match> {
        let game = Arc::new(Match::new(*next_id));
        *next_id += 1;
        log::debug!("match {}: created", game.id());
        game
    }

    fn reap(&mut self) {
        while let Some(joined) = self.sessions.try_join_next() {
            report(joined);
        }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

fn report(joined: Result<Result<EndReason, SessionError>, tokio::task::JoinError>) {
    if let Err(e) = joined {
        log::error!("session task failed: {}", e);
    }
}
