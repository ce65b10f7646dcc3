//! `ActivationController`: embedded in [`super::WakewordTrigger`], holding
//! the min/max activation duration state machine.
//!
//! `ACTIVATE`/`DEACTIVATE` are dispatched by
//! [`crate::pipeline::SpeechPipeline`] from a single post-chain edge
//! detection on `context.is_active` — this controller only flips the flag.
//! `TIMEOUT` has no boolean edge to detect, so it is dispatched here,
//! directly, before the flag flips. That ordering means `TIMEOUT` and
//! `DEACTIVATE` can both be dispatched on the same frame when both the
//! timeout and VAD-fall conditions hold, but there is only ever one
//! `DEACTIVATE`, since the driver dispatches it exactly once per true->false
//! edge no matter which branch below caused it.

use crate::context::{EventKind, SpeechContext};

pub struct ActivationController {
    min_active_frames: u32,
    max_active_frames: u32,
    active_length: u32,
}

impl ActivationController {
    pub fn new(min_active_frames: u32, max_active_frames: u32) -> Self {
        Self {
            min_active_frames,
            max_active_frames,
            active_length: 0,
        }
    }

    pub fn active_length(&self) -> u32 {
        self.active_length
    }

    pub fn reset(&mut self) {
        self.active_length = 0;
    }

    /// IDLE -> ACTIVE transition, on phrase match or external `set_active(true)`.
    pub fn activate(&mut self, context: &mut SpeechContext) {
        context.is_active = true;
        self.active_length = 1;
        log::info!("wakeword: activated");
    }

    /// Call once per frame while `context.is_active` is true.
    /// `vad_falling_edge` is this frame's `is_speech` true->false transition.
    pub fn tick(&mut self, context: &mut SpeechContext, vad_falling_edge: bool) {
        if !context.is_active {
            return;
        }
        self.active_length += 1;

        if self.active_length > self.max_active_frames {
            context.dispatch(EventKind::Timeout);
            context.is_active = false;
            self.active_length = 0;
            log::info!("wakeword: timed out");
            return;
        }

        if self.active_length > self.min_active_frames && vad_falling_edge {
            context.is_active = false;
            self.active_length = 0;
            log::info!("wakeword: deactivated on VAD fall");
        }
    }
}
