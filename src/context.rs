//! `SpeechContext`: the shared mutable record threaded through the stage
//! chain once per frame.
//!
//! Every stage reads and writes the same context on every frame; this module
//! also owns the closed set of lifecycle events and the subscriber list that
//! receives them.

use crate::error::PipelineError;
use crate::preroll::PreRollBuffer;

/// Closed set of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Activate,
    Deactivate,
    Recognize,
    PartialRecognize,
    Timeout,
    Error,
    Trace,
}

/// Diagnostic verbosity threshold for `TRACE` events (`trace-level`
/// configuration key). Ordered so stages can gate emission with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    None = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
}

impl TraceLevel {
    pub fn from_i32(v: i32) -> Self {
        match v {
            v if v <= 0 => TraceLevel::None,
            1 => TraceLevel::Error,
            2 => TraceLevel::Info,
            _ => TraceLevel::Debug,
        }
    }
}

/// A subscriber to pipeline lifecycle events. Invoked synchronously on the
/// pipeline's worker thread — implementations must not block and must not
/// attempt to mutate the context they are given.
pub trait EventListener: Send {
    fn on_event(&mut self, kind: EventKind, context: &SpeechContext);
}

/// Shared mutable state threaded through every stage once per frame.
///
/// Single-writer: only the pipeline's worker thread ever mutates fields
/// other than `is_active`, which external callers may also flip through
/// `SpeechPipeline::set_active` under the pipeline's lock.
pub struct SpeechContext {
    pub is_speech: bool,
    pub is_active: bool,
    pub transcript: String,
    pub confidence: f32,
    pub error: Option<PipelineError>,
    pub pre_roll: PreRollBuffer,
    pub trace_level: TraceLevel,
    pub message: Option<String>,
    pub is_partial: bool,
    subscribers: Vec<Box<dyn EventListener>>,
}

impl SpeechContext {
    pub fn new(pre_roll_capacity_frames: usize) -> Self {
        Self {
            is_speech: false,
            is_active: false,
            transcript: String::new(),
            confidence: 0.0,
            error: None,
            pre_roll: PreRollBuffer::new(pre_roll_capacity_frames),
            trace_level: TraceLevel::None,
            message: None,
            is_partial: false,
            subscribers: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn EventListener>) {
        self.subscribers.push(listener);
    }

    /// Dispatch `kind` to every subscriber, in registration order.
    pub fn dispatch(&mut self, kind: EventKind) {
        let mut subscribers = std::mem::take(&mut self.subscribers);
        for listener in subscribers.iter_mut() {
            listener.on_event(kind, self);
        }
        self.subscribers = subscribers;
    }

    /// Record an error and immediately dispatch `ERROR`; clears the error
    /// afterward so it never lingers into the next frame.
    pub fn raise_error(&mut self, error: PipelineError) {
        log::warn!("stage error: {error}");
        self.error = Some(error);
        self.dispatch(EventKind::Error);
        self.error = None;
    }

    pub fn trace(&mut self, level: TraceLevel, message: impl Into<String>) {
        if self.trace_level < level {
            return;
        }
        self.message = Some(message.into());
        self.dispatch(EventKind::Trace);
        self.message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingListener(Arc<Mutex<Vec<EventKind>>>);

    impl EventListener for RecordingListener {
        fn on_event(&mut self, kind: EventKind, _context: &SpeechContext) {
            self.0.lock().unwrap().push(kind);
        }
    }

    #[test]
    fn dispatch_invokes_listeners_in_order() {
        let mut ctx = SpeechContext::new(4);
        let log = Arc::new(Mutex::new(Vec::new()));
        ctx.add_listener(Box::new(RecordingListener(log.clone())));
        ctx.dispatch(EventKind::Activate);
        ctx.dispatch(EventKind::Deactivate);
        assert_eq!(
            *log.lock().unwrap(),
            vec![EventKind::Activate, EventKind::Deactivate]
        );
    }

    #[test]
    fn raise_error_clears_after_dispatch() {
        let mut ctx = SpeechContext::new(4);
        ctx.raise_error(PipelineError::dsp("native VAD failure"));
        assert!(ctx.error.is_none());
    }

    #[test]
    fn trace_below_threshold_is_suppressed() {
        let mut ctx = SpeechContext::new(4);
        let log = Arc::new(Mutex::new(Vec::new()));
        ctx.add_listener(Box::new(RecordingListener(log.clone())));
        ctx.trace_level = TraceLevel::None;
        ctx.trace(TraceLevel::Debug, "should not fire");
        assert!(log.lock().unwrap().is_empty());

        ctx.trace_level = TraceLevel::Debug;
        ctx.trace(TraceLevel::Debug, "fires");
        assert_eq!(*log.lock().unwrap(), vec![EventKind::Trace]);
    }
}
