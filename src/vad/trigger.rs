//! `VoiceActivityTrigger`: edge-detects `is_speech` and activates on the
//! rising edge. Used in place of [`crate::wakeword::WakewordTrigger`] when no
//! wake words are configured — every utterance activates the pipeline
//! directly.
//!
//! Only flips `context.is_active`; [`crate::pipeline::SpeechPipeline`]
//! dispatches `ACTIVATE` from a single post-chain edge detection, same as it
//! does for [`crate::wakeword::WakewordTrigger`].

use crate::context::SpeechContext;
use crate::error::Result;
use crate::stage::Stage;

pub struct VoiceActivityTrigger {
    was_speech: bool,
}

impl VoiceActivityTrigger {
    pub fn new() -> Self {
        Self { was_speech: false }
    }
}

impl Default for VoiceActivityTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for VoiceActivityTrigger {
    fn process(&mut self, context: &mut SpeechContext, _frame: &mut [u8]) -> Result<()> {
        let rising_edge = context.is_speech && !self.was_speech;
        self.was_speech = context.is_speech;

        if rising_edge && !context.is_active {
            context.is_active = true;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.was_speech = false;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "VoiceActivityTrigger"
    }
}
