//! accepts connections two by two
//! seats each pair in its own match
//! waits for both choices every round
//! computes the winner, sends results and asks both players to continue

use anyhow::Context;
use clap::Parser;
use shifumi::{Acceptor, Listener, ServerConfig, TcpLineListener, Transport, WsListener};

async fn serve<L: Listener>(listener: L, config: &ServerConfig) -> anyhow::Result<()> {
    log::info!(
        "listening on {} ({:?})",
        listener.local_addr()?,
        config.transport
    );
    let acceptor = Acceptor::new(listener)
        .idle_timeout(config.idle_timeout())
        .max_matches(config.matches);

    tokio::select! {
        served = acceptor.run() => served,
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupted, shutting down");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = ServerConfig::parse();

    match config.transport {
        Transport::Tcp => {
            let listener = TcpLineListener::bind(&config.addr)
                .await
                .with_context(|| format!("failed to bind {}", config.addr))?;
            serve(listener, &config).await
        }
        Transport::Ws => {
            let listener = WsListener::bind(&config.addr)
                .await
                .with_context(|| format!("failed to bind {}", config.addr))?;
            serve(listener, &config).await
        }
    }
}
