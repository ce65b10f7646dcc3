//! Streaming speech pipeline core: voice-activity detection, a three-stage
//! neural wakeword trigger, an activation controller, and the ring-buffer
//! machinery and worker-thread driver that tie them together.
//!
//! An [`audio_source::AudioSource`] feeds fixed-width PCM frames into a
//! [`pipeline::SpeechPipeline`], which threads a mutable
//! [`context::SpeechContext`] through an ordered [`stage::Stage`] chain on a
//! dedicated worker thread and dispatches lifecycle events to subscribers.
//! See `DESIGN.md` for how each module's design choices were arrived at.

pub mod audio_source;
pub mod config;
pub mod context;
pub mod dsp;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preroll;
pub mod ring_buffer;
pub mod stage;
pub mod vad;
pub mod wakeword;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{ConfigBuilder, ConfigValue, PipelineConfig};
pub use context::{EventKind, EventListener, SpeechContext, TraceLevel};
pub use error::{PipelineError, Result};
pub use pipeline::SpeechPipeline;
pub use preroll::PreRollBuffer;
pub use ring_buffer::RingBuffer;
pub use stage::Stage;
