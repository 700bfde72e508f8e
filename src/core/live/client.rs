//! Gemini Live WebSocket client.
//!
//! One persistent bidirectional session per relay connection. The connect
//! routine dials the endpoint with the API key header and sends the setup
//! message before handing the split halves back, so by construction no
//! audio can be forwarded ahead of the handshake and the setup is sent
//! exactly once.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message, client::IntoClientRequest};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::info;

use super::config::LiveConfig;
use super::messages::{RealtimeInputEnvelope, SetupEnvelope};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors from the upstream session leg.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Dial or handshake failure; the session never reaches ready state.
    #[error("upstream connection failed: {0}")]
    ConnectionFailed(String),

    /// Socket-level failure on an established session.
    #[error("upstream websocket error: {0}")]
    WebSocket(String),

    /// Outbound message could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for upstream session operations.
pub type LiveResult<T> = Result<T, LiveError>;

/// Namespace for establishing upstream sessions.
pub struct LiveClient;

impl LiveClient {
    /// Dial the Live endpoint, complete the setup handshake, and return the
    /// split transport halves.
    pub async fn connect(config: &LiveConfig) -> LiveResult<(LiveSink, LiveStream)> {
        let mut request = config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;
        request.headers_mut().insert(
            "x-goog-api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?,
        );

        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        info!(model = %config.model, "connected to Gemini Live");

        let (sink, stream) = ws.split();
        let mut sink = LiveSink { sink };
        sink.send_json(&SetupEnvelope::new(config)).await?;

        Ok((sink, LiveStream { stream }))
    }
}

/// Write half of an upstream session.
pub struct LiveSink {
    sink: SplitSink<WsStream, Message>,
}

impl LiveSink {
    async fn send_json<T: Serialize>(&mut self, value: &T) -> LiveResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| LiveError::Serialization(e.to_string()))?;
        self.sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| LiveError::WebSocket(e.to_string()))
    }

    /// Wrap one raw PCM16 frame in a realtime audio envelope and send it.
    pub async fn send_realtime_audio(&mut self, pcm: &[u8]) -> LiveResult<()> {
        self.send_json(&RealtimeInputEnvelope::audio(pcm)).await
    }

    /// Forward already-valid control JSON verbatim.
    pub async fn forward_raw(&mut self, json: String) -> LiveResult<()> {
        self.sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| LiveError::WebSocket(e.to_string()))
    }

    pub async fn ping(&mut self) -> LiveResult<()> {
        self.sink
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| LiveError::WebSocket(e.to_string()))
    }

    pub async fn pong(&mut self, payload: bytes::Bytes) -> LiveResult<()> {
        self.sink
            .send(Message::Pong(payload))
            .await
            .map_err(|e| LiveError::WebSocket(e.to_string()))
    }

    /// Close the session with an explicit code and reason.
    pub async fn close(&mut self, code: u16, reason: &str) -> LiveResult<()> {
        self.sink
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            })))
            .await
            .map_err(|e| LiveError::WebSocket(e.to_string()))
    }
}

/// Read half of an upstream session.
pub struct LiveStream {
    stream: SplitStream<WsStream>,
}

impl LiveStream {
    pub async fn next(&mut self) -> Option<Result<Message, tungstenite::Error>> {
        self.stream.next().await
    }
}
