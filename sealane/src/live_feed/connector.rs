//! Transports that deliver feed lines to the listener.
//!
//! The [`FeedConnector`] trait abstracts over how lines reach the listener,
//! so the state machine can run against the relay's WebSocket, a GPS source
//! speaking plain TCP, or a scripted stream in tests.

use std::future::Future;
use std::pin::Pin;

use futures::{stream, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

use super::error::ConnectionError;
use super::protocol::line_frames;

/// Default relay endpoint.
pub const DEFAULT_FEED_URL: &str = "ws://localhost:3001";

/// Stream of trimmed, non-empty lines from one open connection.
///
/// The stream ends when the remote side closes.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, ConnectionError>> + Send>>;

/// Opens connections to a feed.
///
/// Each call to [`connect`](Self::connect) opens a fresh connection; the
/// connection closes when the returned stream is dropped.
pub trait FeedConnector: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<LineStream, ConnectionError>> + Send;

    /// Human readable target for logs.
    fn target(&self) -> String;
}

/// Subscribes to a relay over WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_URL)
    }
}

impl FeedConnector for WebSocketConnector {
    async fn connect(&self) -> Result<LineStream, ConnectionError> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ConnectionError::Connect {
                target: self.url.clone(),
                reason: e.to_string(),
            })?;

        let lines = socket
            .filter_map(|message| async move {
                match message {
                    Ok(Message::Text(text)) => Some(split_lines(text.as_str())),
                    Ok(Message::Binary(data)) => Some(split_lines(&String::from_utf8_lossy(&data))),
                    Ok(_) => None,
                    Err(e) => Some(vec![Err(ConnectionError::Stream(e.to_string()))]),
                }
            })
            .flat_map(stream::iter);

        Ok(Box::pin(lines))
    }

    fn target(&self) -> String {
        self.url.clone()
    }
}

/// A single WebSocket message may carry several lines.
fn split_lines(text: &str) -> Vec<Result<String, ConnectionError>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Ok(line.to_string()))
        .collect()
}

/// Reads newline framed records straight from a TCP source.
#[derive(Debug, Clone)]
pub struct TcpLineConnector {
    address: String,
}

impl TcpLineConnector {
    /// `address` is `host:port`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl FeedConnector for TcpLineConnector {
    async fn connect(&self) -> Result<LineStream, ConnectionError> {
        let socket = TcpStream::connect(self.address.as_str())
            .await
            .map_err(|e| ConnectionError::Connect {
                target: self.address.clone(),
                reason: e.to_string(),
            })?;

        let lines = line_frames(socket)
            .map(|frame| frame.map_err(|e| ConnectionError::Stream(e.to_string())));

        Ok(Box::pin(lines))
    }

    fn target(&self) -> String {
        format!("tcp://{}", self.address)
    }
}
