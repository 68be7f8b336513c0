pub mod acceptor;
pub mod client;
pub mod clients;
pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod session;
pub mod utils;
