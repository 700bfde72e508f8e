//! Client-side audio pipelines.
//!
//! Two independent real-time paths surround the relay:
//!
//! - **Capture**: [`resampler::PcmCapture`] downsamples native-rate capture
//!   blocks to fixed-rate PCM16 frames for the wire.
//! - **Playback**: [`playback::PlaybackScheduler`] plays inbound chunks in
//!   strict arrival order through an [`playback::AudioSink`], with
//!   queue-flush on interruption.
//!
//! [`pcm::AudioFrame`] is the shared decoded representation.

pub mod pcm;
pub mod playback;
pub mod resampler;

pub use pcm::{AudioError, AudioFrame, AudioResult};
pub use playback::{AudioSink, PlaybackScheduler};
pub use resampler::{DEFAULT_INPUT_RATE, PcmCapture, TARGET_SAMPLE_RATE};
