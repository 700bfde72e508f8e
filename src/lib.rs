pub mod client;
pub mod config;
pub mod core;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use client::{CaptureSource, VoiceClient};
pub use config::{ConfigError, ServerConfig};
pub use crate::core::audio::{AudioError, AudioFrame, AudioSink, PcmCapture, PlaybackScheduler};
pub use crate::core::live::{LiveConfig, LiveError};
pub use state::AppState;
