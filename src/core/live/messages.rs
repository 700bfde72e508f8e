//! Wire types for the Gemini Live protocol.
//!
//! The first message after connect is the immutable setup object; every
//! later outbound message is either a realtime audio envelope or a client
//! content turn. Inbound server payloads are treated as opaque JSON except
//! for the interrupted-turn flag, which the relay must act on.

use base64::prelude::*;
use serde::Serialize;
use serde_json::Value;

use super::config::{INPUT_AUDIO_MIME, LiveConfig};

// =============================================================================
// Setup
// =============================================================================

/// `{setup: {...}}`, sent exactly once, immediately after connect.
#[derive(Debug, Serialize)]
pub struct SetupEnvelope {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    /// Request transcription of the user's audio.
    pub input_audio_transcription: EmptyOptions,
    /// Request transcription of the model's audio.
    pub output_audio_transcription: EmptyOptions,
    pub realtime_input_config: EmptyOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

/// Serializes as `{}`; presence of the key enables the option upstream.
#[derive(Debug, Default, Serialize)]
pub struct EmptyOptions {}

impl SetupEnvelope {
    /// Build the session setup from config: model, persona, audio output
    /// modality and transcription for both directions.
    pub fn new(config: &LiveConfig) -> Self {
        Self {
            setup: Setup {
                model: config.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                },
                system_instruction: Content {
                    parts: vec![Part {
                        text: config.system_instruction.clone(),
                    }],
                },
                input_audio_transcription: EmptyOptions {},
                output_audio_transcription: EmptyOptions {},
                realtime_input_config: EmptyOptions {},
            },
        }
    }
}

// =============================================================================
// Realtime input
// =============================================================================

/// `{realtimeInput: {...}}`: streaming audio or the end-of-stream marker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputEnvelope {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioBlob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBlob {
    pub mime_type: String,
    pub data: String,
}

impl RealtimeInputEnvelope {
    /// Wrap one raw PCM16 frame as a base64 realtime audio message.
    pub fn audio(pcm: &[u8]) -> Self {
        Self {
            realtime_input: RealtimeInput {
                audio: Some(AudioBlob {
                    mime_type: INPUT_AUDIO_MIME.to_string(),
                    data: BASE64_STANDARD.encode(pcm),
                }),
                audio_stream_end: None,
            },
        }
    }

    /// Signal that the capture stream has ended.
    pub fn audio_stream_end() -> Self {
        Self {
            realtime_input: RealtimeInput {
                audio: None,
                audio_stream_end: Some(true),
            },
        }
    }
}

// =============================================================================
// Client content
// =============================================================================

/// `{clientContent: {...}}`: a complete typed user turn that bypasses the
/// audio path.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContentEnvelope {
    pub client_content: ClientContent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Turn>,
    pub turn_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<Part>,
}

impl ClientContentEnvelope {
    /// One complete user text turn.
    pub fn user_turn(text: impl Into<String>) -> Self {
        Self {
            client_content: ClientContent {
                turns: vec![Turn {
                    role: "user".to_string(),
                    parts: vec![Part { text: text.into() }],
                }],
                turn_complete: true,
            },
        }
    }
}

// =============================================================================
// Server payload inspection
// =============================================================================

/// Whether a server payload signals that the model's turn was interrupted
/// by the user speaking over playback. Only an explicit `true` counts; a
/// missing, `null` or non-boolean flag does not.
pub fn is_interrupted(payload: &Value) -> bool {
    payload
        .pointer("/serverContent/interrupted")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Extract the sample rate from a PCM MIME descriptor such as
/// `audio/pcm;rate=24000`.
pub fn pcm_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("rate="))
        .and_then(|r| r.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> LiveConfig {
        LiveConfig {
            url: "ws://localhost:1".to_string(),
            api_key: "key".to_string(),
            model: "models/test-dialog".to_string(),
            system_instruction: "Be brief.".to_string(),
        }
    }

    #[test]
    fn test_setup_shape() {
        let value = serde_json::to_value(SetupEnvelope::new(&test_config())).unwrap();
        assert_eq!(value["setup"]["model"], "models/test-dialog");
        assert_eq!(
            value["setup"]["generationConfig"]["responseModalities"],
            json!(["AUDIO"])
        );
        assert_eq!(
            value["setup"]["systemInstruction"]["parts"][0]["text"],
            "Be brief."
        );
        // Transcription options are present (as empty objects) for both
        // directions, plus the realtime input config.
        assert_eq!(value["setup"]["inputAudioTranscription"], json!({}));
        assert_eq!(value["setup"]["outputAudioTranscription"], json!({}));
        assert_eq!(value["setup"]["realtimeInputConfig"], json!({}));
    }

    #[test]
    fn test_audio_envelope_round_trip() {
        let pcm: Vec<u8> = (0..=255).collect();
        let value = serde_json::to_value(RealtimeInputEnvelope::audio(&pcm)).unwrap();
        let blob = &value["realtimeInput"]["audio"];
        assert_eq!(blob["mimeType"], "audio/pcm;rate=16000");
        let decoded = BASE64_STANDARD
            .decode(blob["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, pcm);
        assert!(value["realtimeInput"].get("audioStreamEnd").is_none());
    }

    #[test]
    fn test_audio_stream_end() {
        let value = serde_json::to_value(RealtimeInputEnvelope::audio_stream_end()).unwrap();
        assert_eq!(value["realtimeInput"]["audioStreamEnd"], json!(true));
        assert!(value["realtimeInput"].get("audio").is_none());
    }

    #[test]
    fn test_user_turn() {
        let value = serde_json::to_value(ClientContentEnvelope::user_turn("hello")).unwrap();
        assert_eq!(value["clientContent"]["turnComplete"], json!(true));
        assert_eq!(
            value["clientContent"]["turns"][0]["parts"][0]["text"],
            "hello"
        );
        assert_eq!(value["clientContent"]["turns"][0]["role"], "user");
    }

    #[test]
    fn test_interrupted_detection() {
        assert!(is_interrupted(
            &json!({"serverContent": {"interrupted": true}})
        ));
        assert!(!is_interrupted(
            &json!({"serverContent": {"interrupted": false}})
        ));
        assert!(!is_interrupted(
            &json!({"serverContent": {"interrupted": null}})
        ));
        assert!(!is_interrupted(&json!({"serverContent": {}})));
        assert!(!is_interrupted(&json!({"setupComplete": {}})));
    }

    #[test]
    fn test_pcm_rate_from_mime() {
        assert_eq!(pcm_rate_from_mime("audio/pcm;rate=24000"), Some(24000));
        assert_eq!(pcm_rate_from_mime("audio/pcm; rate=16000"), Some(16000));
        assert_eq!(pcm_rate_from_mime("audio/pcm"), None);
        assert_eq!(pcm_rate_from_mime("audio/pcm;rate=abc"), None);
    }
}
