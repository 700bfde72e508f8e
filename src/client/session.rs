//! Client session: relay transport ownership and envelope routing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::core::audio::{AudioSink, PcmCapture, PlaybackScheduler};
use crate::core::live::messages::{
    ClientContentEnvelope, RealtimeInputEnvelope, pcm_rate_from_mime,
};
use crate::handlers::relay::RelayEnvelope;

use super::CaptureSource;

/// Sample rate the model's audio replies arrive at when the MIME
/// descriptor does not say otherwise.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Outbound channel capacity toward the relay.
const SEND_CHANNEL_CAPACITY: usize = 256;

/// Errors from the client session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Dial failure toward the relay.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The session is no longer connected.
    #[error("not connected")]
    NotConnected,

    /// Outbound message could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for client session operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// One client session against the relay.
///
/// Owns the transport; inbound envelopes are routed to the per-session
/// playback queue and the transcript log, outbound frames go through a
/// single writer task.
pub struct VoiceClient {
    sender: mpsc::Sender<Message>,
    scheduler: Arc<PlaybackScheduler>,
    capture: PcmCapture,
    connected: Arc<AtomicBool>,
    recv_task: JoinHandle<()>,
    send_task: JoinHandle<()>,
}

impl VoiceClient {
    /// Dial the relay and start the receive loop.
    ///
    /// The playback queue is created here, once per session, and discarded
    /// when the client is dropped.
    pub async fn connect(url: &str, sink: Arc<dyn AudioSink>) -> ClientResult<Self> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;
        info!(url, "connected to relay");

        let (mut ws_tx, mut ws_rx) = ws.split();
        let (sender, mut send_rx) = mpsc::channel::<Message>(SEND_CHANNEL_CAPACITY);

        let scheduler = Arc::new(PlaybackScheduler::spawn(sink));
        let connected = Arc::new(AtomicBool::new(true));

        let send_task = tokio::spawn(async move {
            while let Some(msg) = send_rx.recv().await {
                if let Err(e) = ws_tx.send(msg).await {
                    warn!("failed to send to relay: {e}");
                    break;
                }
            }
        });

        let recv_scheduler = scheduler.clone();
        let recv_connected = connected.clone();
        let recv_task = tokio::spawn(async move {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<RelayEnvelope>(&text) {
                        Ok(envelope) => route_envelope(envelope, &recv_scheduler),
                        Err(e) => warn!("dropping unrecognized relay message: {e}"),
                    },
                    // Untagged binary passthrough has no consumer here.
                    Ok(Message::Binary(data)) => {
                        debug!(bytes = data.len(), "ignoring binary passthrough")
                    }
                    Ok(Message::Close(_)) => {
                        info!("relay closed the session");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("relay websocket error: {e}");
                        break;
                    }
                }
            }
            recv_connected.store(false, Ordering::SeqCst);
        });

        Ok(Self {
            sender,
            scheduler,
            capture: PcmCapture::default(),
            connected,
            recv_task,
            send_task,
        })
    }

    /// Whether the session is still up (backs the UI connection dot).
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Chunks queued for playback but not yet started.
    pub fn pending_playback(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Pump a capture source until it ends, sending one binary frame per
    /// produced block, then signal end of the audio stream.
    pub async fn run_capture<S: CaptureSource>(&self, mut source: S) -> ClientResult<()> {
        while let Some(block) = source.next_block().await {
            // Empty blocks produce no frame; that is a no-op, not an error.
            if let Some(frame) = self.capture.process(&block) {
                self.send(Message::Binary(frame)).await?;
            }
        }
        self.end_audio_stream().await
    }

    /// Send a typed user turn, bypassing the audio path.
    pub async fn send_text(&self, text: &str) -> ClientResult<()> {
        self.send_json(&ClientContentEnvelope::user_turn(text)).await
    }

    /// Tell upstream that the capture stream has ended.
    pub async fn end_audio_stream(&self) -> ClientResult<()> {
        self.send_json(&RealtimeInputEnvelope::audio_stream_end())
            .await
    }

    async fn send_json<T: Serialize>(&self, value: &T) -> ClientResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.send(Message::Text(json.into())).await
    }

    async fn send(&self, msg: Message) -> ClientResult<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| ClientError::NotConnected)
    }
}

impl Drop for VoiceClient {
    fn drop(&mut self) {
        self.recv_task.abort();
        self.send_task.abort();
    }
}

/// Route one relay envelope.
fn route_envelope(envelope: RelayEnvelope, scheduler: &PlaybackScheduler) {
    match envelope {
        RelayEnvelope::Interrupted => {
            info!("interrupted, flushing pending playback");
            scheduler.interrupt();
        }
        RelayEnvelope::Gemini { data } => handle_gemini(&data, scheduler),
        RelayEnvelope::Error { error } => warn!("relay error: {error}"),
    }
}

/// Surface transcripts and queue any inline audio parts for playback.
fn handle_gemini(data: &Value, scheduler: &PlaybackScheduler) {
    if let Some(text) = data
        .pointer("/serverContent/inputTranscription/text")
        .and_then(Value::as_str)
    {
        info!(role = "user", "{text}");
    }
    if let Some(text) = data
        .pointer("/serverContent/outputTranscription/text")
        .and_then(Value::as_str)
    {
        info!(role = "assistant", "{text}");
    }
    for (data, rate) in extract_inline_audio(data) {
        scheduler.enqueue(data, rate);
    }
}

/// Pull base64 inline audio out of a model turn, in part order. Payloads
/// stay base64 here; the playback worker decodes them and skips bad ones.
fn extract_inline_audio(data: &Value) -> Vec<(String, u32)> {
    let mut chunks = Vec::new();
    let Some(parts) = data
        .pointer("/serverContent/modelTurn/parts")
        .and_then(Value::as_array)
    else {
        return chunks;
    };
    for part in parts {
        let Some(inline) = part.get("inlineData") else {
            continue;
        };
        let (Some(mime), Some(b64)) = (
            inline.get("mimeType").and_then(Value::as_str),
            inline.get("data").and_then(Value::as_str),
        ) else {
            continue;
        };
        let rate = pcm_rate_from_mime(mime).unwrap_or(PLAYBACK_SAMPLE_RATE);
        chunks.push((b64.to_string(), rate));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::prelude::*;
    use serde_json::json;

    use crate::core::audio::{AudioFrame, AudioResult};

    struct NullSink;

    #[async_trait]
    impl AudioSink for NullSink {
        async fn play(&self, _frame: AudioFrame) -> AudioResult<()> {
            // Never resolves: keeps queued chunks pending for inspection.
            std::future::pending().await
        }
    }

    fn model_turn(parts: Vec<Value>) -> Value {
        json!({"serverContent": {"modelTurn": {"parts": parts}}})
    }

    #[test]
    fn test_extract_inline_audio_in_part_order() {
        let pcm_a = BASE64_STANDARD.encode([1u8, 0, 2, 0]);
        let pcm_b = BASE64_STANDARD.encode([3u8, 0]);
        let data = model_turn(vec![
            json!({"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": pcm_a}}),
            json!({"text": "spoken reply"}),
            json!({"inlineData": {"mimeType": "audio/pcm;rate=16000", "data": pcm_b}}),
        ]);

        let chunks = extract_inline_audio(&data);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0, pcm_a);
        assert_eq!(chunks[0].1, 24000);
        assert_eq!(chunks[1].0, pcm_b);
        assert_eq!(chunks[1].1, 16000);
    }

    #[test]
    fn test_extract_skips_missing_fields() {
        let data = model_turn(vec![
            json!({"inlineData": {"mimeType": "audio/pcm;rate=24000"}}),
            json!({"inlineData": {"data": BASE64_STANDARD.encode([9u8, 0])}}),
            json!({"text": "no audio here"}),
        ]);
        let chunks = extract_inline_audio(&data);
        // Only the part with a data field is usable; without a MIME
        // descriptor it falls back to the default rate.
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].1, PLAYBACK_SAMPLE_RATE);
    }

    #[test]
    fn test_no_model_turn_is_empty() {
        assert!(extract_inline_audio(&json!({"setupComplete": {}})).is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_envelope_flushes_queue() {
        let scheduler = PlaybackScheduler::spawn(Arc::new(NullSink));
        let pcm = BASE64_STANDARD.encode([0u8; 8]);
        let data = model_turn(vec![
            json!({"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": pcm.clone()}}),
            json!({"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": pcm.clone()}}),
            json!({"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": pcm}}),
        ]);

        route_envelope(RelayEnvelope::Gemini { data }, &scheduler);
        // The worker may have taken the first chunk into the sink already;
        // everything still pending must vanish on interruption.
        route_envelope(RelayEnvelope::Interrupted, &scheduler);
        assert_eq!(scheduler.pending_len(), 0);
    }
}
