//! Session relay: one client WebSocket paired with one upstream Live
//! session.
//!
//! # Protocol
//!
//! ## Client → relay
//!
//! - **Binary frames**: raw 16 kHz mono PCM16, wrapped for upstream
//! - **JSON frames**: control messages forwarded upstream verbatim
//!   (typed turns, audio-stream-end)
//!
//! ## Relay → client
//!
//! - **gemini**: opaque upstream payload
//! - **interrupted**: flush pending playback immediately
//! - **error**: generic error line
//! - **Binary frames**: upstream binary passthrough, untagged

mod handler;
pub mod messages;
pub mod session;

pub use handler::relay_handler;
pub use messages::RelayEnvelope;
pub use session::{CloseState, RelaySession};
