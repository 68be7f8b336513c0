use std::{error::Error, fmt, io};

use crate::libserver::client::{EndReason, PlayerSlot};

/// Player input the server does not understand. Recoverable: the player is
/// prompted again and the match is not touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    UnknownChoice(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownChoice(text) => write!(f, "unknown choice {:?}", text),
        }
    }
}

impl Error for ProtocolError {}

/// A connection that can no longer be used.
#[derive(Debug)]
pub enum ConnectionError {
    Closed,
    TimedOut,
    Io(io::Error),
    WebSocket(tungstenite::Error),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Closed => f.write_str("connection closed by peer"),
            ConnectionError::TimedOut => f.write_str("no input before the idle timeout"),
            ConnectionError::Io(e) => write!(f, "i/o error: {}", e),
            ConnectionError::WebSocket(e) => write!(f, "websocket error: {}", e),
        }
    }
}

impl Error for ConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConnectionError::Io(e) => Some(e),
            ConnectionError::WebSocket(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConnectionError {
    fn from(e: io::Error) -> Self {
        ConnectionError::Io(e)
    }
}

impl From<tungstenite::Error> for ConnectionError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                ConnectionError::Closed
            }
            tungstenite::Error::Io(e) => ConnectionError::Io(e),
            e => ConnectionError::WebSocket(e),
        }
    }
}

/// Rejections and termination results from the match coordinator.
///
/// `Ended` is the normal way a suspended call learns the match is over. The
/// remaining variants mean the caller asked for something out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    Full,
    Ended(EndReason),
    WrongRound { current: u32, requested: u32 },
    NotAcceptingChoices,
    AlreadyChose { slot: PlayerSlot, round: u32 },
    NotVoting,
    AlreadyVoted { slot: PlayerSlot, round: u32 },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Full => f.write_str("match already has two players"),
            MatchError::Ended(reason) => write!(f, "match ended: {}", reason),
            MatchError::WrongRound { current, requested } => {
                write!(f, "round {} requested during round {}", requested, current)
            }
            MatchError::NotAcceptingChoices => f.write_str("match is not accepting choices"),
            MatchError::AlreadyChose { slot, round } => {
                write!(f, "{} already chose in round {}", slot, round)
            }
            MatchError::NotVoting => f.write_str("match is not collecting continue votes"),
            MatchError::AlreadyVoted { slot, round } => {
                write!(f, "{} already voted in round {}", slot, round)
            }
        }
    }
}

impl Error for MatchError {}

/// Why a session stopped driving its player.
#[derive(Debug)]
pub enum SessionError {
    PeerLost(ConnectionError),
    Match(MatchError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::PeerLost(e) => write!(f, "peer lost: {}", e),
            SessionError::Match(e) => write!(f, "match rejected request: {}", e),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::PeerLost(e) => Some(e),
            SessionError::Match(e) => Some(e),
        }
    }
}

impl From<ConnectionError> for SessionError {
    fn from(e: ConnectionError) -> Self {
        SessionError::PeerLost(e)
    }
}

impl From<MatchError> for SessionError {
    fn from(e: MatchError) -> Self {
        SessionError::Match(e)
    }
}
