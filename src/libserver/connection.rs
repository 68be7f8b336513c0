//! Line-oriented transports a session can drive: raw TCP lines, and
//! WebSocket text frames carrying one line each.

use crate::libserver::error::ConnectionError;
use crate::libserver::utils::strip_line;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::Message;

/// A bidirectional channel of text lines.
///
/// `receive_line` must be cancel-safe: sessions race it against other events
/// and drop it when they lose.
pub trait Connection: Send + 'static {
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    fn receive_line(&mut self) -> impl Future<Output = Result<String, ConnectionError>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Something that hands out connections, one per client.
pub trait Listener: Send {
    type Conn: Connection;

    fn accept(&mut self) -> impl Future<Output = std::io::Result<Self::Conn>> + Send;

    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

pub struct LineConnection<R, W> {
    lines: Lines<BufReader<R>>,
    writer: W,
}

impl<R, W> LineConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        LineConnection {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }
}

impl LineConnection<tokio::net::tcp::OwnedReadHalf, tokio::net::tcp::OwnedWriteHalf> {
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        LineConnection::new(reader, writer)
    }
}

impl<R, W> Connection for LineConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send_line(&mut self, line: &str) -> Result<(), ConnectionError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn receive_line(&mut self) -> Result<String, ConnectionError> {
        match self.lines.next_line().await? {
            Some(line) => Ok(strip_line(&line).to_string()),
            None => Err(ConnectionError::Closed),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            log::debug!("shutdown after session end: {}", e);
        }
    }
}

pub struct WsConnection<S> {
    stream: WebSocketStream<S>,
}

impl<S> WsConnection<S> {
    pub fn new(stream: WebSocketStream<S>) -> Self {
        WsConnection { stream }
    }
}

impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_line(&mut self, line: &str) -> Result<(), ConnectionError> {
        self.stream.send(Message::Text(line.to_string())).await?;
        Ok(())
    }

    async fn receive_line(&mut self) -> Result<String, ConnectionError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(strip_line(&text).to_string()),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(strip_line(&String::from_utf8_lossy(&bytes)).to_string())
                }
                Some(Ok(Message::Close(_))) | None => return Err(ConnectionError::Closed),
                // Pings are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            log::debug!("websocket close after session end: {}", e);
        }
    }
}

pub struct TcpLineListener {
    listener: TcpListener,
}

impl TcpLineListener {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        Ok(TcpLineListener {
            listener: TcpListener::bind(addr).await?,
        })
    }
}

impl Listener for TcpLineListener {
    type Conn = LineConnection<tokio::net::tcp::OwnedReadHalf, tokio::net::tcp::OwnedWriteHalf>;

    async fn accept(&mut self) -> std::io::Result<Self::Conn> {
        let (stream, addr) = self.listener.accept().await?;
        log::info!("incoming tcp connection from {}", addr);
        Ok(LineConnection::from_tcp(stream))
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        Ok(WsListener {
            listener: TcpListener::bind(addr).await?,
        })
    }
}

impl Listener for WsListener {
    type Conn = WsConnection<TcpStream>;

    /// Sockets that fail the WebSocket handshake are dropped and the next one
    /// is accepted; only a failing listener is reported.
    async fn accept(&mut self) -> std::io::Result<Self::Conn> {
        loop {
            let (raw_stream, addr) = self.listener.accept().await?;
            log::info!("incoming websocket connection from {}", addr);
            match tokio_tungstenite::accept_async(raw_stream).await {
                Ok(ws_stream) => return Ok(WsConnection::new(ws_stream)),
                Err(e) => log::warn!("websocket handshake with {} failed: {}", addr, e),
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
