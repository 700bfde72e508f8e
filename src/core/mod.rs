//! Core components: the audio pipelines and the upstream session leg.

pub mod audio;
pub mod live;

pub use audio::{AudioError, AudioFrame, AudioSink, PcmCapture, PlaybackScheduler};
pub use live::{LiveClient, LiveConfig, LiveError};
