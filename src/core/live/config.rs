//! Gemini Live session configuration.

/// Gemini Live bidirectional streaming endpoint.
pub const LIVE_API_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default dialog model.
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-preview-native-audio-dialog";

/// MIME descriptor for audio forwarded to the session.
pub const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

/// Default system instruction: the "Rev" assistant persona.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are \"Rev\", a helpful voice assistant for Revolt Motors (revoltmotors.com).\n\
Only answer questions about Revolt products, services, EV bikes, charging, service, dealer locations, test rides, pricing, financing, offers, and website/app support.\n\
If a user asks about anything outside Revolt or requests personal/financial advice, politely decline and steer the user back to Revolt topics.\n\
Match the user's language automatically (English, Hindi, Marathi, etc.). Keep responses concise (1-2 sentences) unless asked for details.";

/// Configuration for one upstream Live session.
///
/// Immutable for the lifetime of the session; the setup message derived
/// from it is sent exactly once.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// WebSocket endpoint to dial.
    pub url: String,
    /// API key sent as the `x-goog-api-key` header.
    pub api_key: String,
    /// Model identifier requested in the setup message.
    pub model: String,
    /// System instruction text for the assistant persona.
    pub system_instruction: String,
}

impl LiveConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: LIVE_API_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}
