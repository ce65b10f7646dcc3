//! `AudioSource`: a capability with `read(frame_buffer)` filling
//! `frame_samples × 2` bytes of 16-bit mono PCM in native byte order,
//! erroring rather than partially filling the buffer.
//!
//! Two implementations ship alongside the trait: a live
//! [`cpal_source::CpalAudioSource`] (behind the `mic` feature) and a
//! [`wav_source::WavFileAudioSource`] fixture replayer for tests and offline
//! runs.

#[cfg(feature = "mic")]
pub mod cpal_source;
pub mod wav_source;

use crate::error::Result;

/// Fills `frame` completely with 16-bit mono PCM, native byte order, or
/// returns an error. Implementations must not partially fill `frame`.
pub trait AudioSource: Send {
    fn read(&mut self, frame: &mut [u8]) -> Result<()>;
}
