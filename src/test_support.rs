//! Hand-rolled test doubles shared between this crate's inline unit tests
//! and the `tests/` end-to-end suite — no mocking framework crate.
//!
//! Gated the same way as [`crate::models::mock`]: visible under
//! `#[cfg(test)]` for in-crate tests and under the `test-support` feature
//! for the external `tests/` suite (which links this crate as an ordinary
//! dependency and can't see `#[cfg(test)]` items).

use crate::audio_source::AudioSource;
use crate::context::{EventKind, EventListener, SpeechContext};
use crate::error::{PipelineError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays a fixed sequence of frames, each tagged with whether it should be
/// reported as speech (the frame's bytes alone don't carry that — VAD
/// decisions are driven by actual PCM content — so scripted pipeline tests
/// skip the VAD stage and set `context.is_speech` directly instead; this
/// double exists for tests that only need deterministic frame bytes, e.g.
/// pre-roll and frame-count assertions).
pub struct ScriptedAudioSource {
    frames: VecDeque<Vec<u8>>,
    frame_len: usize,
}

impl ScriptedAudioSource {
    pub fn new(frame_len: usize, frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            frame_len,
        }
    }

    /// `count` frames of all-zero silence.
    pub fn silence(frame_len: usize, count: usize) -> Self {
        Self::new(frame_len, vec![vec![0u8; frame_len]; count])
    }
}

impl AudioSource for ScriptedAudioSource {
    fn read(&mut self, frame: &mut [u8]) -> Result<()> {
        let next = self.frames.pop_front().ok_or_else(|| {
            PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "scripted audio source exhausted",
            ))
        })?;
        if next.len() != self.frame_len || frame.len() != self.frame_len {
            return Err(PipelineError::frame_size("scripted frame length mismatch"));
        }
        frame.copy_from_slice(&next);
        Ok(())
    }
}

/// Records dispatched events into a shared, lock-guarded vector so test code
/// can assert on it after the pipeline has moved the listener onto its
/// worker thread.
#[derive(Clone, Default)]
pub struct VecEventSink {
    events: Arc<Mutex<Vec<EventKind>>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().clone()
    }
}

impl EventListener for VecEventSink {
    fn on_event(&mut self, kind: EventKind, _context: &SpeechContext) {
        self.events.lock().unwrap().push(kind);
    }
}
