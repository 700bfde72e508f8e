//! Client runtime: the counterpart of the browser main context.
//!
//! The client owns its relay transport exclusively. Capture runs as its
//! own task and hands frames over by message passing only; playback
//! scheduling is serialized by the per-session [`PlaybackScheduler`]
//! worker. The two sides never share mutable audio state.
//!
//! [`PlaybackScheduler`]: crate::core::audio::PlaybackScheduler

mod session;

use async_trait::async_trait;

pub use session::{ClientError, ClientResult, PLAYBACK_SAMPLE_RATE, VoiceClient};

/// Source of live capture blocks.
///
/// The real-time capture context sits behind this seam; it yields blocks
/// of floating-point samples in `[-1.0, 1.0]` at the native input rate and
/// returns `None` when capture stops.
#[async_trait]
pub trait CaptureSource: Send {
    async fn next_block(&mut self) -> Option<Vec<f32>>;
}
