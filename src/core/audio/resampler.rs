//! Capture-side downsampler and PCM16 quantizer.
//!
//! Microphone capture runs at the device's native rate (commonly 48 kHz)
//! while the upstream session expects 16 kHz mono PCM16. Each capture block
//! is resampled by linear interpolation and quantized independently; no
//! state is kept between blocks. This trades a possible click at block
//! boundaries for statelessness.

use bytes::Bytes;

/// Default capture rate of the audio device.
pub const DEFAULT_INPUT_RATE: u32 = 48000;

/// Target rate expected by the upstream session.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Converts floating-point capture blocks to fixed-rate PCM16 frames.
///
/// Input and target rates are fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy)]
pub struct PcmCapture {
    in_rate: u32,
    target_rate: u32,
}

impl PcmCapture {
    pub fn new(in_rate: u32, target_rate: u32) -> Self {
        Self {
            in_rate,
            target_rate,
        }
    }

    /// Input-to-output rate ratio.
    fn ratio(&self) -> f64 {
        self.in_rate as f64 / self.target_rate as f64
    }

    /// Number of output samples produced for an input block of `input_len`
    /// samples: `floor(input_len / (in_rate / target_rate))`.
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len as f64 / self.ratio()).floor() as usize
    }

    /// Resample one capture block and quantize it to little-endian PCM16.
    ///
    /// Samples are expected in `[-1.0, 1.0]`; out-of-range values are
    /// clamped before quantization. An empty block, or one too short to
    /// produce any output sample, yields `None` rather than an error.
    pub fn process(&self, block: &[f32]) -> Option<Bytes> {
        if block.is_empty() {
            return None;
        }
        let ratio = self.ratio();
        let out_len = self.output_len(block.len());
        if out_len == 0 {
            return None;
        }

        let mut pcm = Vec::with_capacity(out_len * 2);
        for i in 0..out_len {
            let t = i as f64 * ratio;
            let i0 = t.floor() as usize;
            let i1 = (i0 + 1).min(block.len() - 1);
            let frac = (t - i0 as f64) as f32;
            let interpolated = block[i0] * (1.0 - frac) + block[i1] * frac;
            let clamped = interpolated.clamp(-1.0, 1.0);
            // Truncate toward zero, matching the capture worklet's `| 0`.
            let sample = (clamped * 32767.0) as i16;
            pcm.extend_from_slice(&sample.to_le_bytes());
        }
        Some(Bytes::from(pcm))
    }
}

impl Default for PcmCapture {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_RATE, TARGET_SAMPLE_RATE)
    }
}
