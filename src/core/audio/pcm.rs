//! PCM16 frame decoding.
//!
//! All audio in the system is fixed-rate mono PCM 16-bit signed little-endian.
//! This module turns raw byte buffers (or their base64 encodings) into
//! normalized floating-point frames for playback.

use base64::prelude::*;
use thiserror::Error;

/// Errors that can occur while decoding audio data.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Byte length is not a whole number of PCM16 samples.
    #[error("truncated PCM16 frame: {0} bytes is not a multiple of 2")]
    TruncatedFrame(usize),

    /// Base64 payload could not be decoded.
    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Playback backend failure.
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// A decoded mono audio frame at a fixed sample rate.
///
/// Samples are normalized to `[-1.0, 1.0)` by dividing the PCM16 value
/// by 32768. The byte length of the source buffer is always
/// `sample_count * 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioFrame {
    /// Decode a raw little-endian PCM16 byte buffer.
    ///
    /// Returns [`AudioError::TruncatedFrame`] when the byte length is odd.
    pub fn from_pcm16_bytes(bytes: &[u8], sample_rate: u32) -> AudioResult<Self> {
        if bytes.len() % 2 != 0 {
            return Err(AudioError::TruncatedFrame(bytes.len()));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Decode a base64-encoded PCM16 payload.
    pub fn from_base64(data: &str, sample_rate: u32) -> AudioResult<Self> {
        let bytes = BASE64_STANDARD.decode(data)?;
        Self::from_pcm16_bytes(&bytes, sample_rate)
    }

    /// Normalized samples in `[-1.0, 1.0)`.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples in the frame.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frame duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pcm16_values() {
        // 0, 16384 (0.5), -32768 (-1.0), 32767 (~1.0)
        let bytes = [0u8, 0, 0, 0x40, 0, 0x80, 0xff, 0x7f];
        let frame = AudioFrame::from_pcm16_bytes(&bytes, 24000).unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.sample_rate(), 24000);
        assert_eq!(frame.samples()[0], 0.0);
        assert_eq!(frame.samples()[1], 0.5);
        assert_eq!(frame.samples()[2], -1.0);
        assert!((frame.samples()[3] - 32767.0 / 32768.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_odd_length_rejected() {
        let err = AudioFrame::from_pcm16_bytes(&[1, 2, 3], 16000).unwrap_err();
        match err {
            AudioError::TruncatedFrame(3) => {}
            other => panic!("expected TruncatedFrame, got {other:?}"),
        }
    }

    #[test]
    fn test_base64_round_trip() {
        let original: Vec<u8> = (0u16..512).flat_map(|v| (v as i16).to_le_bytes()).collect();
        let encoded = BASE64_STANDARD.encode(&original);
        let frame = AudioFrame::from_base64(&encoded, 16000).unwrap();
        assert_eq!(frame.len(), original.len() / 2);
        // Re-encode the samples and compare byte-for-byte.
        let bytes: Vec<u8> = frame
            .samples()
            .iter()
            .flat_map(|s| (((s * 32768.0) as i32) as i16).to_le_bytes())
            .collect();
        assert_eq!(bytes, original);
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            AudioFrame::from_base64("not base64!!", 16000),
            Err(AudioError::Base64(_))
        ));
    }

    #[test]
    fn test_duration() {
        // 2400 samples at 24 kHz is 100 ms.
        let bytes = vec![0u8; 4800];
        let frame = AudioFrame::from_pcm16_bytes(&bytes, 24000).unwrap();
        assert_eq!(frame.duration_ms(), 100.0);
    }
}
