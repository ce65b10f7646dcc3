//! [`WavFileAudioSource`]: replays a mono 16-bit WAV file frame by frame,
//! either looping back to the start at EOF or erroring, per a constructor
//! flag.

use super::AudioSource;
use crate::error::{PipelineError, Result};
use std::io;
use std::path::Path;

pub struct WavFileAudioSource {
    samples: Vec<i16>,
    frame_samples: usize,
    position: usize,
    loop_at_eof: bool,
}

impl WavFileAudioSource {
    pub fn open(path: impl AsRef<Path>, frame_samples: usize, loop_at_eof: bool) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())
            .map_err(|e| PipelineError::config(format!("failed to open wav file: {e}")))?;
        let spec = reader.spec();
        if spec.channels != 1 || spec.bits_per_sample != 16 {
            return Err(PipelineError::config(format!(
                "wav file must be mono 16-bit PCM, got {} channel(s) at {} bits",
                spec.channels, spec.bits_per_sample
            )));
        }
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| PipelineError::config(format!("failed to read wav samples: {e}")))?;

        Ok(Self {
            samples,
            frame_samples,
            position: 0,
            loop_at_eof,
        })
    }
}

impl AudioSource for WavFileAudioSource {
    fn read(&mut self, frame: &mut [u8]) -> Result<()> {
        if frame.len() != self.frame_samples * 2 {
            return Err(PipelineError::frame_size(format!(
                "expected {} bytes, got {}",
                self.frame_samples * 2,
                frame.len()
            )));
        }

        if self.position + self.frame_samples > self.samples.len() {
            if self.loop_at_eof && !self.samples.is_empty() {
                self.position = 0;
            } else {
                return Err(PipelineError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "wav file exhausted",
                )));
            }
        }

        let end = self.position + self.frame_samples;
        for (i, &sample) in self.samples[self.position..end].iter().enumerate() {
            let bytes = sample.to_ne_bytes();
            frame[i * 2] = bytes[0];
            frame[i * 2 + 1] = bytes[1];
        }
        self.position = end;
        Ok(())
    }
}
