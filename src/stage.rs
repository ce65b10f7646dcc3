//! `Stage`: the uniform contract every pipeline stage implements.
//!
//! Stages are trait objects owned by [`crate::pipeline::SpeechPipeline`] and
//! invoked in strict registration order, each given exclusive mutable access
//! to the shared [`SpeechContext`] and the current frame.

use crate::context::SpeechContext;
use crate::error::Result;

/// One link in the stage chain. `process` mutates the frame in place and/or
/// annotates the context; a returned `Err` is caught by the driver, folded
/// into `context.error`, and dispatched as an `ERROR` event — it never
/// aborts the pipeline.
pub trait Stage: Send {
    /// Process one frame of 16-bit PCM, native byte order.
    fn process(&mut self, context: &mut SpeechContext, frame: &mut [u8]) -> Result<()>;

    /// Reset internal state, e.g. on VAD falling edge or pipeline restart.
    /// Default is a no-op for stateless stages.
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release any owned native resources (model runners, DSP handles).
    /// Called by the driver in reverse registration order at shutdown.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Name used in logs; defaults to the Rust type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
