//! `AcousticNoiseSuppressor` and `AutomaticGainControl`: in-place 16-bit PCM
//! frame transforms wrapping the native `webrtc-audio-processing` module.
//!
//! Each stage owns its own `Processor` instance and thus its own gain/noise
//! state — no shared or global state between pipeline instances.

use crate::context::SpeechContext;
use crate::error::{PipelineError, Result};
use crate::stage::Stage;
use webrtc_audio_processing::{
    Config, GainControlConfig, GainControlMode, InitializationConfig, NoiseSuppressionConfig,
    NoiseSuppressionLevel, Processor,
};

/// WebRTC's audio processing module always operates internally in 10ms
/// chunks regardless of the caller's frame width.
const NATIVE_CHUNK_MS: u32 = 10;

/// Thin wrapper around a `Processor` that rechunks an arbitrary-width i16
/// frame into the 10ms float chunks the native module requires.
struct NativeApm {
    processor: Processor,
    chunk_samples: usize,
}

impl NativeApm {
    fn new(sample_rate_hz: u32, config: Config) -> Result<Self> {
        let mut processor = Processor::new(&InitializationConfig {
            num_capture_channels: 1,
            num_render_channels: 1,
            sample_rate_hz,
        })
        .map_err(|e| PipelineError::dsp(format!("failed to initialize audio processor: {e:?}")))?;
        processor.set_config(config);
        Ok(Self {
            processor,
            chunk_samples: (sample_rate_hz * NATIVE_CHUNK_MS / 1000) as usize,
        })
    }

    fn process_in_place(&mut self, samples: &mut [f32]) -> Result<()> {
        for chunk in samples.chunks_mut(self.chunk_samples) {
            if chunk.len() != self.chunk_samples {
                // Final partial chunk: pad, process, copy back the valid prefix.
                let mut padded = vec![0.0f32; self.chunk_samples];
                padded[..chunk.len()].copy_from_slice(chunk);
                self.processor
                    .process_capture_frame(&mut [&mut padded])
                    .map_err(|e| PipelineError::dsp(format!("apm failed: {e:?}")))?;
                chunk.copy_from_slice(&padded[..chunk.len()]);
            } else {
                self.processor
                    .process_capture_frame(&mut [chunk])
                    .map_err(|e| PipelineError::dsp(format!("apm failed: {e:?}")))?;
            }
        }
        Ok(())
    }
}

fn decode_i16_frame(frame: &[u8]) -> Vec<f32> {
    frame
        .chunks_exact(2)
        .map(|b| i16::from_ne_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
        .collect()
}

fn encode_i16_frame(samples: &[f32], frame: &mut [u8]) {
    for (i, s) in samples.iter().enumerate() {
        let clamped = s.clamp(-1.0, 1.0);
        let pcm = (clamped * i16::MAX as f32) as i16;
        let bytes = pcm.to_ne_bytes();
        frame[i * 2] = bytes[0];
        frame[i * 2 + 1] = bytes[1];
    }
}

/// Native noise suppression, applied before AGC in the stage chain.
pub struct AcousticNoiseSuppressor {
    apm: NativeApm,
}

impl AcousticNoiseSuppressor {
    pub fn new(sample_rate_hz: u32) -> Result<Self> {
        let config = Config {
            noise_suppression: Some(NoiseSuppressionConfig {
                suppression_level: NoiseSuppressionLevel::Moderate,
            }),
            ..Config::default()
        };
        Ok(Self {
            apm: NativeApm::new(sample_rate_hz, config)?,
        })
    }
}

impl Stage for AcousticNoiseSuppressor {
    fn process(&mut self, _context: &mut SpeechContext, frame: &mut [u8]) -> Result<()> {
        let mut samples = decode_i16_frame(frame);
        self.apm.process_in_place(&mut samples)?;
        encode_i16_frame(&samples, frame);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AcousticNoiseSuppressor"
    }
}

/// Native automatic gain control. Per-instance target level state — see
/// module docs.
pub struct AutomaticGainControl {
    apm: NativeApm,
}

impl AutomaticGainControl {
    pub fn new(sample_rate_hz: u32) -> Result<Self> {
        let config = Config {
            gain_control: Some(GainControlConfig {
                mode: GainControlMode::AdaptiveDigital,
                target_level_dbfs: 3,
                compression_gain_db: 9,
                enable_limiter: true,
            }),
            ..Config::default()
        };
        Ok(Self {
            apm: NativeApm::new(sample_rate_hz, config)?,
        })
    }
}

impl Stage for AutomaticGainControl {
    fn process(&mut self, _context: &mut SpeechContext, frame: &mut [u8]) -> Result<()> {
        let mut samples = decode_i16_frame(frame);
        self.apm.process_in_place(&mut samples)?;
        encode_i16_frame(&samples, frame);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AutomaticGainControl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_round_trip_preserves_silence() {
        let frame = vec![0u8; 40];
        let samples = decode_i16_frame(&frame);
        assert!(samples.iter().all(|&s| s == 0.0));
        let mut out = vec![0u8; 40];
        encode_i16_frame(&samples, &mut out);
        assert_eq!(frame, out);
    }
}
