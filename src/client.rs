use anyhow::Context;
use clap::Parser;
use shifumi::libclient::{
    bot::Bot,
    state::{Game, GameState},
    utils::parse_line,
};
use shifumi::{ClientConfig, Connection, LineConnection, Transport, WsConnection};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;

async fn main_loop<C: Connection>(mut conn: C, bot: Option<Bot>) -> anyhow::Result<()> {
    let mut game = Game::default();
    let mut rng = rand::thread_rng();
    let mut input = BufReader::new(stdin()).lines();
    let mut input_open = bot.is_none();

    while game.state != GameState::Over {
        tokio::select! {
            line = conn.receive_line() => {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("server connection lost: {}", e);
                        break;
                    }
                };
                println!("{}", line);
                let parsed = parse_line(&line);
                game.observe(&parsed);
                if let Some(bot) = &bot {
                    if let Some(answer) = bot.answer(&parsed, &game, &mut rng) {
                        println!("> {}", answer);
                        conn.send_line(&answer).await?;
                        game.answered();
                    }
                }
            }
            line = input.next_line(), if input_open => {
                match line? {
                    Some(line) => {
                        conn.send_line(&line).await?;
                        game.answered();
                    }
                    None => input_open = false,
                }
            }
        }
    }

    log::info!(
        "done after {} rounds, score {} - {}",
        game.rounds,
        game.scores.0,
        game.scores.1
    );
    conn.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = ClientConfig::parse();
    let bot = config.bot.then(|| Bot {
        rounds: config.rounds,
    });

    match config.transport {
        Transport::Tcp => {
            let stream = TcpStream::connect(&config.addr)
                .await
                .with_context(|| format!("failed to connect to {}", config.addr))?;
            log::info!("connected to {}", config.addr);
            main_loop(LineConnection::from_tcp(stream), bot).await
        }
        Transport::Ws => {
            let url = url::Url::parse(&format!("ws://{}/", config.addr))?;
            let (ws, _) = connect_async(url)
                .await
                .with_context(|| format!("failed to connect to {}", config.addr))?;
            log::info!("connected to {}", config.addr);
            main_loop(WsConnection::new(ws), bot).await
        }
    }
}
