//! Relay WebSocket handler.
//!
//! Pairs one client WebSocket with one upstream Gemini Live session and
//! mediates all traffic for its lifetime: audio wrapping on the way up,
//! envelope tagging on the way down, keepalive for both legs, and
//! symmetric idempotent teardown.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::{debug, error, info, warn};

use crate::core::live::{LiveClient, LiveSink, is_interrupted};
use crate::state::AppState;

use super::messages::RelayEnvelope;
use super::session::RelaySession;

/// Ping cadence for both transports while the session is open.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Maximum WebSocket message size (10 MB).
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_ERROR: u16 = 1011;

type ClientSink = SplitSink<WebSocket, Message>;

/// Relay WebSocket handler.
///
/// Upgrades the HTTP connection; each upgraded socket gets its own
/// upstream session and its own session context; nothing is shared
/// between connections.
pub async fn relay_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state))
}

async fn handle_relay_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut session = RelaySession::new();
    let session_id = session.id;
    info!(%session_id, "relay session opened");

    let (mut client_tx, mut client_rx) = socket.split();

    // Dial upstream the moment the client connects. Client frames arriving
    // before the handshake completes are drained and dropped, not buffered.
    let connect = LiveClient::connect(&state.config.live);
    tokio::pin!(connect);
    let (mut up_sink, mut up_stream) = loop {
        tokio::select! {
            res = &mut connect => match res {
                Ok(halves) => break halves,
                Err(e) => {
                    error!(%session_id, "upstream unavailable: {e}");
                    let _ = send_envelope(
                        &mut client_tx,
                        &RelayEnvelope::Error {
                            error: "Upstream error".to_string(),
                        },
                    )
                    .await;
                    let _ = client_tx
                        .send(Message::Close(Some(CloseFrame {
                            code: CLOSE_ERROR,
                            reason: "upstream unavailable".to_string().into(),
                        })))
                        .await;
                    return;
                }
            },
            msg = client_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    info!(%session_id, "client left before upstream was ready");
                    return;
                }
                Some(Ok(_)) => {
                    debug!(%session_id, "upstream not ready, dropping client frame");
                }
                Some(Err(e)) => {
                    warn!(%session_id, "client websocket error while dialing upstream: {e}");
                    return;
                }
            },
        }
    };

    debug!(%session_id, "upstream ready, setup sent");

    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            msg = client_rx.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    debug!(%session_id, bytes = data.len(), "client audio frame");
                    if let Err(e) = up_sink.send_realtime_audio(&data).await {
                        error!(%session_id, "failed to forward audio upstream: {e}");
                        teardown(&mut session, &mut client_tx, &mut up_sink,
                                 CLOSE_ERROR, "upstream error", true).await;
                        break;
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    // Out-of-band control JSON bypasses the audio path and is
                    // forwarded verbatim once it parses.
                    match serde_json::from_str::<serde_json::Value>(&text) {
                        Ok(_) => {
                            if let Err(e) = up_sink.forward_raw(text.to_string()).await {
                                error!(%session_id, "failed to forward control message: {e}");
                                teardown(&mut session, &mut client_tx, &mut up_sink,
                                         CLOSE_ERROR, "upstream error", true).await;
                                break;
                            }
                        }
                        Err(e) => warn!(%session_id, "dropping malformed client JSON: {e}"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    session.close.mark_client();
                    let (code, reason) = frame
                        .map(|f| (f.code, f.reason.to_string()))
                        .unwrap_or((CLOSE_NORMAL, String::new()));
                    if session.close.mark_upstream() {
                        let _ = up_sink.close(code, &reason).await;
                    }
                    info!(%session_id, code, "client closed, upstream closed to match");
                    break;
                }
                Some(Ok(_)) => {} // ping/pong: axum replies to pings itself
                Some(Err(e)) => {
                    warn!(%session_id, "client websocket error: {e}");
                    teardown(&mut session, &mut client_tx, &mut up_sink,
                             CLOSE_ERROR, "client error", false).await;
                    break;
                }
                None => {
                    session.close.mark_client();
                    if session.close.mark_upstream() {
                        let _ = up_sink.close(CLOSE_NORMAL, "client gone").await;
                    }
                    info!(%session_id, "client stream ended");
                    break;
                }
            },
            msg = up_stream.next() => match msg {
                Some(Ok(UpstreamMessage::Binary(data))) => {
                    // Binary passthrough, untagged.
                    if client_tx.send(Message::Binary(data)).await.is_err() {
                        teardown(&mut session, &mut client_tx, &mut up_sink,
                                 CLOSE_ERROR, "client error", false).await;
                        break;
                    }
                }
                Some(Ok(UpstreamMessage::Text(text))) => {
                    match serde_json::from_str::<serde_json::Value>(&text) {
                        Ok(payload) => {
                            let interrupted = is_interrupted(&payload);
                            if send_envelope(&mut client_tx, &RelayEnvelope::Gemini { data: payload })
                                .await
                                .is_err()
                            {
                                teardown(&mut session, &mut client_tx, &mut up_sink,
                                         CLOSE_ERROR, "client error", false).await;
                                break;
                            }
                            if interrupted {
                                info!(%session_id, "model turn interrupted by user");
                                if send_envelope(&mut client_tx, &RelayEnvelope::Interrupted)
                                    .await
                                    .is_err()
                                {
                                    teardown(&mut session, &mut client_tx, &mut up_sink,
                                             CLOSE_ERROR, "client error", false).await;
                                    break;
                                }
                            }
                        }
                        Err(e) => warn!(%session_id, "dropping malformed upstream JSON: {e}"),
                    }
                }
                Some(Ok(UpstreamMessage::Ping(payload))) => {
                    let _ = up_sink.pong(payload).await;
                }
                Some(Ok(UpstreamMessage::Close(frame))) => {
                    session.close.mark_upstream();
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((CLOSE_NORMAL, String::new()));
                    if session.close.mark_client() {
                        let _ = client_tx
                            .send(Message::Close(Some(CloseFrame {
                                code,
                                reason: reason.into(),
                            })))
                            .await;
                    }
                    info!(%session_id, code, "upstream closed, client closed to match");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(%session_id, "upstream websocket error: {e}");
                    teardown(&mut session, &mut client_tx, &mut up_sink,
                             CLOSE_ERROR, "upstream error", true).await;
                    break;
                }
                None => {
                    session.close.mark_upstream();
                    if session.close.mark_client() {
                        let _ = client_tx
                            .send(Message::Close(Some(CloseFrame {
                                code: CLOSE_NORMAL,
                                reason: "upstream gone".to_string().into(),
                            })))
                            .await;
                    }
                    info!(%session_id, "upstream stream ended");
                    break;
                }
            },
            _ = keepalive.tick() => {
                let _ = client_tx.send(Message::Ping(Vec::new().into())).await;
                let _ = up_sink.ping().await;
                debug!(%session_id, "keepalive pings sent");
            }
        }
    }

    // The keepalive timer is scoped to the loop, so it is gone by now.
    info!(%session_id, "relay session terminated");
}

/// Close both transport halves, each at most once. When `notify_client`
/// is set and the client is still open, a generic error envelope is sent
/// ahead of the close frame.
async fn teardown(
    session: &mut RelaySession,
    client_tx: &mut ClientSink,
    up_sink: &mut LiveSink,
    code: u16,
    reason: &str,
    notify_client: bool,
) {
    if session.close.mark_client() {
        if notify_client {
            let _ = send_envelope(
                client_tx,
                &RelayEnvelope::Error {
                    error: "Upstream error".to_string(),
                },
            )
            .await;
        }
        let _ = client_tx
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.to_string().into(),
            })))
            .await;
    }
    if session.close.mark_upstream() {
        let _ = up_sink.close(code, reason).await;
    }
}

async fn send_envelope(tx: &mut ClientSink, envelope: &RelayEnvelope) -> Result<(), axum::Error> {
    match serde_json::to_string(envelope) {
        Ok(json) => tx.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("failed to serialize relay envelope: {e}");
            Ok(())
        }
    }
}
