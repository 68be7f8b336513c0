//! Two-player Shifumi (rock-paper-scissors) over the network.
//!
//! `libserver` pairs connections into matches and referees them round by
//! round; `libclient` understands what the server says.

pub mod libclient;
pub mod libserver;

pub use libserver::acceptor::Acceptor;
pub use libserver::clients::{Match, Opponent};
pub use libserver::config::{ClientConfig, ServerConfig, Transport};
pub use libserver::connection::{
    Connection, LineConnection, Listener, TcpLineListener, WsConnection, WsListener,
};
