//! `ModelRunner`: abstraction over a preloaded tensor model with a
//! fixed-size input buffer, a fixed-size output buffer, and `run()`. Used by
//! [`crate::wakeword::WakewordTrigger`] for both the mel filterbank model and
//! the classifier model.
//!
//! Tensor element access is realized directly as `&[f32]`/`&mut [f32]`
//! rather than raw byte buffers — every tensor here is 32-bit float, native
//! byte order, so a float slice is the idiomatic Rust expression of that
//! contract.

pub mod tflite;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

use crate::error::Result;

/// A preloaded model with fixed-size input/output buffers.
pub trait ModelRunner: Send {
    /// Number of `f32` elements the model expects as input.
    fn input_len(&self) -> usize;

    /// Number of `f32` elements the model produces as output.
    fn output_len(&self) -> usize;

    /// Writable view over the input buffer. Callers fill this completely
    /// before calling [`ModelRunner::run`].
    fn input_mut(&mut self) -> &mut [f32];

    /// Readable view over the output produced by the last `run()`.
    fn output(&self) -> &[f32];

    /// Perform a synchronous forward pass over the current input buffer.
    fn run(&mut self) -> Result<()>;

    /// Release any native resources. Default no-op for runners with nothing
    /// to release.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
