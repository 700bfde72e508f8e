//! Ordered playback scheduling.
//!
//! Inbound audio chunks must play in strict arrival order with no overlap,
//! and an interruption signal must flush everything that has not started
//! yet. The scheduler keeps an explicit FIFO of pending chunks consumed by
//! a single dedicated worker task; at most one chunk is ever handed to the
//! sink at a time, so the worker itself is the only concurrency control
//! needed.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::pcm::{AudioFrame, AudioResult};

/// Playback backend seam.
///
/// `play` resolves once the frame has finished playing; the worker relies
/// on that to enforce back-to-back, non-overlapping playback.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, frame: AudioFrame) -> AudioResult<()>;
}

/// A chunk waiting to be decoded and played, still in its base64 wire form.
struct PendingChunk {
    data: String,
    sample_rate: u32,
}

/// FIFO playback queue with a single worker task.
///
/// Created once per client session at connect time and discarded on
/// disconnect (dropping the scheduler aborts the worker). Interruption
/// atomically clears pending chunks; a chunk already handed to the sink is
/// left to finish.
pub struct PlaybackScheduler {
    queue: Arc<Mutex<VecDeque<PendingChunk>>>,
    notify: Arc<Notify>,
    worker: JoinHandle<()>,
}

impl PlaybackScheduler {
    /// Spawn the playback worker against the given sink.
    pub fn spawn(sink: Arc<dyn AudioSink>) -> Self {
        let queue: Arc<Mutex<VecDeque<PendingChunk>>> = Arc::new(Mutex::new(VecDeque::new()));
        let notify = Arc::new(Notify::new());

        let worker_queue = queue.clone();
        let worker_notify = notify.clone();
        let worker = tokio::spawn(async move {
            loop {
                let chunk = worker_queue.lock().pop_front();
                let Some(chunk) = chunk else {
                    worker_notify.notified().await;
                    continue;
                };

                // A bad chunk is skipped; the chain keeps going.
                match AudioFrame::from_base64(&chunk.data, chunk.sample_rate) {
                    Ok(frame) => {
                        debug!(
                            samples = frame.len(),
                            rate = frame.sample_rate(),
                            ms = frame.duration_ms(),
                            "playing audio chunk"
                        );
                        if let Err(e) = sink.play(frame).await {
                            warn!("playback failed for one chunk: {e}");
                        }
                    }
                    Err(e) => {
                        warn!("skipping undecodable audio chunk: {e}");
                    }
                }
            }
        });

        Self {
            queue,
            notify,
            worker,
        }
    }

    /// Append one base64-encoded PCM16 chunk to the end of the queue.
    pub fn enqueue(&self, data: String, sample_rate: u32) {
        self.queue.lock().push_back(PendingChunk { data, sample_rate });
        self.notify.notify_one();
    }

    /// Flush every chunk that has not started playing.
    ///
    /// The chunk currently inside the sink (if any) finishes normally.
    pub fn interrupt(&self) {
        let dropped = {
            let mut queue = self.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            debug!(dropped, "playback queue flushed on interruption");
        }
    }

    /// Number of chunks queued but not yet started.
    pub fn pending_len(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use base64::prelude::*;
    use tokio::sync::{Semaphore, mpsc};
    use tokio::time::timeout;

    use crate::core::audio::pcm::AudioError;

    /// Sink that records playback order (first sample of each frame) and
    /// flags any overlapping play calls.
    struct RecordingSink {
        active: AtomicBool,
        overlapped: AtomicBool,
        done_tx: mpsc::UnboundedSender<i16>,
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn play(&self, frame: AudioFrame) -> AudioResult<()> {
            if self.active.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.store(false, Ordering::SeqCst);
            let marker = (frame.samples()[0] * 32768.0) as i16;
            let _ = self.done_tx.send(marker);
            Ok(())
        }
    }

    /// Sink that signals when a chunk starts and holds it until released.
    struct GatedSink {
        started_tx: mpsc::UnboundedSender<()>,
        gate: Semaphore,
    }

    #[async_trait]
    impl AudioSink for GatedSink {
        async fn play(&self, _frame: AudioFrame) -> AudioResult<()> {
            let _ = self.started_tx.send(());
            let permit = self.gate.acquire().await.map_err(|e| {
                AudioError::Playback(e.to_string())
            })?;
            permit.forget();
            Ok(())
        }
    }

    fn chunk_with_marker(marker: i16) -> String {
        let mut bytes = marker.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 6]);
        BASE64_STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn test_playback_order_matches_enqueue_order() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink {
            active: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            done_tx,
        });
        let scheduler = PlaybackScheduler::spawn(sink.clone());

        for marker in [1i16, 2, 3, 4, 5] {
            scheduler.enqueue(chunk_with_marker(marker), 24000);
        }

        let mut played = Vec::new();
        for _ in 0..5 {
            let marker = timeout(Duration::from_secs(2), done_rx.recv())
                .await
                .expect("playback stalled")
                .unwrap();
            played.push(marker);
        }
        assert_eq!(played, vec![1, 2, 3, 4, 5]);
        assert!(!sink.overlapped.load(Ordering::SeqCst), "chunks overlapped");
    }

    #[tokio::test]
    async fn test_interrupt_clears_pending_keeps_in_flight() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(GatedSink {
            started_tx,
            gate: Semaphore::new(0),
        });
        let scheduler = PlaybackScheduler::spawn(sink.clone());

        scheduler.enqueue(chunk_with_marker(1), 24000);
        scheduler.enqueue(chunk_with_marker(2), 24000);
        scheduler.enqueue(chunk_with_marker(3), 24000);

        // Wait until the first chunk is inside the sink.
        timeout(Duration::from_secs(2), started_rx.recv())
            .await
            .expect("first chunk never started");

        scheduler.interrupt();
        assert_eq!(scheduler.pending_len(), 0);

        // Let the in-flight chunk finish; nothing else may start.
        sink.gate.add_permits(1);
        let no_more = timeout(Duration::from_millis(200), started_rx.recv()).await;
        assert!(no_more.is_err(), "a flushed chunk started playing");

        // The queue keeps working after an interruption.
        scheduler.enqueue(chunk_with_marker(4), 24000);
        timeout(Duration::from_secs(2), started_rx.recv())
            .await
            .expect("queue dead after interruption");
        sink.gate.add_permits(1);
    }

    #[tokio::test]
    async fn test_bad_chunk_does_not_stall_the_queue() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink {
            active: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            done_tx,
        });
        let scheduler = PlaybackScheduler::spawn(sink);

        // Invalid base64, then an odd byte length: both must be skipped.
        scheduler.enqueue("!!! not base64".to_string(), 24000);
        scheduler.enqueue(BASE64_STANDARD.encode([1u8, 2, 3]), 24000);
        scheduler.enqueue(chunk_with_marker(7), 24000);

        let marker = timeout(Duration::from_secs(2), done_rx.recv())
            .await
            .expect("queue stalled on bad chunk")
            .unwrap();
        assert_eq!(marker, 7);
    }

    #[tokio::test]
    async fn test_interrupt_on_empty_queue_is_harmless() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink {
            active: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            done_tx,
        });
        let scheduler = PlaybackScheduler::spawn(sink);

        scheduler.interrupt();
        scheduler.interrupt();
        assert_eq!(scheduler.pending_len(), 0);

        scheduler.enqueue(chunk_with_marker(9), 24000);
        let marker = timeout(Duration::from_secs(2), done_rx.recv())
            .await
            .expect("queue stalled")
            .unwrap();
        assert_eq!(marker, 9);
    }
}
