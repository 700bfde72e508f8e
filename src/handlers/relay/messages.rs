//! Relay wire envelopes.
//!
//! Client → relay traffic is either raw binary audio or control JSON that
//! is forwarded upstream verbatim, so only the relay → client direction
//! needs typed envelopes here. Binary frames pass through untagged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tagged JSON messages from the relay to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayEnvelope {
    /// An opaque upstream payload, passed through for the client to route.
    #[serde(rename = "gemini")]
    Gemini {
        /// Parsed upstream JSON.
        data: Value,
    },

    /// The model's spoken turn was cut short; flush pending playback now.
    #[serde(rename = "interrupted")]
    Interrupted,

    /// Generic error surface; structured kinds are not distinguished.
    #[serde(rename = "error")]
    Error {
        /// Human-readable error line.
        error: String,
    },
}
