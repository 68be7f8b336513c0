use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3490";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Plain text, one message per line.
    Tcp,
    /// One WebSocket text frame per line.
    Ws,
}

/// Shifumi match server: pairs clients two by two and referees their rounds.
#[derive(Debug, Parser)]
#[command(name = "server", version)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: String,

    #[arg(long, value_enum, default_value_t = Transport::Tcp)]
    pub transport: Transport,

    /// Seconds a player may take to answer before being dropped.
    #[arg(long, value_name = "SECS")]
    pub idle_timeout: Option<u64>,

    /// Exit after this many matches have been played.
    #[arg(long, value_name = "N")]
    pub matches: Option<usize>,
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout.map(Duration::from_secs)
    }
}

/// Console client for the Shifumi server.
#[derive(Debug, Parser)]
#[command(name = "client", version)]
pub struct ClientConfig {
    /// Server address, `host:port`.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: String,

    #[arg(long, value_enum, default_value_t = Transport::Tcp)]
    pub transport: Transport,

    /// Answer prompts automatically with random choices.
    #[arg(long)]
    pub bot: bool,

    /// Rounds the bot plays before declining to continue.
    #[arg(long, default_value_t = 3)]
    pub rounds: u32,
}
