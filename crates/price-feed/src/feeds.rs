//! WebSocket ticker feed: combined-stream URL, frame parsing and the connection seam

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use signaldeck_core::{PriceFeedError, PriceFeedResult, Quote, Symbol};

/// Combined-stream URL for the per-symbol ticker channels,
/// e.g. `wss://host/stream?streams=btcusdt@ticker/ethusdt@ticker`
pub fn combined_stream_url(stream_url: &str, symbols: &[Symbol]) -> String {
    let streams = symbols
        .iter()
        .map(Symbol::stream_name)
        .collect::<Vec<_>>()
        .join("/");

    format!("{}/stream?streams={}", stream_url.trim_end_matches('/'), streams)
}

/// Combined-stream wrapper: `{"stream": "...", "data": {...}}`
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[serde(default)]
    stream: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Ticker fields carried by a `<symbol>@ticker` payload
#[derive(Debug, Clone, Deserialize)]
pub struct TickerEvent {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub last_price: String,
    #[serde(rename = "p")]
    pub price_change: String,
    #[serde(rename = "P")]
    pub price_change_percent: String,
}

/// Parse one text frame of the combined stream.
///
/// `Ok(None)` for frames without a payload (acks, control frames),
/// `Err` for anything malformed.
pub fn parse_stream_message(text: &str) -> PriceFeedResult<Option<Quote>> {
    let envelope: StreamEnvelope = serde_json::from_str(text)?;

    let Some(data) = envelope.data else {
        return Ok(None);
    };

    let event: TickerEvent = serde_json::from_value(data).map_err(|e| {
        PriceFeedError::InvalidMessage(format!(
            "bad ticker payload on {}: {e}",
            envelope.stream.as_deref().unwrap_or("<unknown stream>")
        ))
    })?;

    let quote = Quote::from_raw(
        Symbol::new(&event.symbol)?,
        &event.last_price,
        &event.price_change,
        &event.price_change_percent,
    )?;

    Ok(Some(quote))
}

/// An open streaming connection delivering text frames one at a time
#[async_trait]
pub trait StreamConnection: Send {
    /// Next text frame, or `None` once the peer has closed the connection
    async fn next_frame(&mut self) -> Option<PriceFeedResult<String>>;

    /// Close the connection with a close handshake
    async fn close(&mut self);
}

/// Opens streaming connections
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> PriceFeedResult<Box<dyn StreamConnection>>;
}

/// tokio-tungstenite connector
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

#[async_trait]
impl StreamConnector for WsConnector {
    async fn connect(&self, url: &str) -> PriceFeedResult<Box<dyn StreamConnection>> {
        info!("Connecting to {}", url);

        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| PriceFeedError::ConnectionFailed(e.to_string()))?;

        Ok(Box::new(WsConnection { ws, closed: false }))
    }
}

pub struct WsConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl StreamConnection for WsConnection {
    async fn next_frame(&mut self) -> Option<PriceFeedResult<String>> {
        if self.closed {
            return None;
        }

        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.ws.send(Message::Pong(data)).await {
                        self.closed = true;
                        return Some(Err(PriceFeedError::ConnectionFailed(e.to_string())));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("WebSocket closed by server: {:?}", frame);
                    self.closed = true;
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed))
                | None => {
                    self.closed = true;
                    return None;
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    self.closed = true;
                    return Some(Err(PriceFeedError::ConnectionFailed(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.ws.close(None).await {
            debug!("Error while closing WebSocket: {}", e);
        }
    }
}
