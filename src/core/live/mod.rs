//! Upstream Gemini Live session leg.
//!
//! The relay owns exactly one Live session per client connection. The
//! submodules split the concern the usual way: `config` for endpoint and
//! session parameters, `messages` for the wire types, `client` for the
//! transport itself.

pub mod client;
pub mod config;
pub mod messages;

pub use client::{LiveClient, LiveError, LiveResult, LiveSink, LiveStream};
pub use config::{DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION, INPUT_AUDIO_MIME, LIVE_API_URL, LiveConfig};
pub use messages::{
    ClientContentEnvelope, RealtimeInputEnvelope, SetupEnvelope, is_interrupted,
    pcm_rate_from_mime,
};
