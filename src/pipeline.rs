//! `SpeechPipeline`: owns an input source and an ordered stage chain, runs
//! the audio loop on a dedicated worker thread, and manages the pre-roll
//! buffer and lifecycle.
//!
//! Cross-thread control (`set_active`, `add_listener`, `stop`) goes through
//! a single `Mutex<SpeechContext>`, held only for the duration of the
//! mutation on the caller's side — the worker thread holds it for the whole
//! per-frame stage chain, since it owns the context and is the only thread
//! event listeners ever run on.

use crate::audio_source::AudioSource;
use crate::context::{EventKind, SpeechContext};
use crate::error::{PipelineError, Result};
use crate::stage::Stage;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// `ACTIVATE`/`DEACTIVATE` are dispatched here, from a single post-chain
/// edge detection on `context.is_active`, regardless of which stage (or
/// external caller) flipped the flag. This is also what resolves the
/// double-`DEACTIVATE` hazard: exactly one `DEACTIVATE` is ever dispatched
/// per true->false edge, however many internal code paths asked for it.
pub struct SpeechPipeline {
    context: Arc<Mutex<SpeechContext>>,
    cancel: Arc<AtomicBool>,
    done_rx: Option<Receiver<()>>,
    worker: Option<JoinHandle<()>>,
    source: Option<Box<dyn AudioSource>>,
    stages: Option<Vec<Box<dyn Stage>>>,
    frame_bytes: usize,
    stop_timeout: Duration,
}

impl SpeechPipeline {
    pub fn new(
        source: Box<dyn AudioSource>,
        stages: Vec<Box<dyn Stage>>,
        frame_samples: usize,
        pre_roll_capacity_frames: usize,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            context: Arc::new(Mutex::new(SpeechContext::new(pre_roll_capacity_frames))),
            cancel: Arc::new(AtomicBool::new(false)),
            done_rx: None,
            worker: None,
            source: Some(source),
            stages: Some(stages),
            frame_bytes: frame_samples * 2,
            stop_timeout,
        }
    }

    /// Subscribe an event listener. Callable from any thread.
    pub fn add_listener(&self, listener: Box<dyn crate::context::EventListener>) {
        self.context.lock().unwrap().add_listener(listener);
    }

    /// Flip `context.is_active`. Callable from any thread; takes effect on
    /// the next processed frame, since events are only ever dispatched from
    /// the worker thread.
    pub fn set_active(&self, active: bool) {
        self.context.lock().unwrap().is_active = active;
    }

    pub fn is_active(&self) -> bool {
        self.context.lock().unwrap().is_active
    }

    /// Spawn the worker thread and begin the audio loop.
    pub fn start(&mut self) -> Result<()> {
        let mut source = self
            .source
            .take()
            .ok_or_else(|| PipelineError::config("pipeline already started"))?;
        let mut stages = self.stages.take().unwrap_or_default();

        let context = self.context.clone();
        let cancel = self.cancel.clone();
        let frame_bytes = self.frame_bytes;
        let (done_tx, done_rx): (Sender<()>, Receiver<()>) = bounded(1);
        self.done_rx = Some(done_rx);

        let handle = thread::Builder::new()
            .name("speech-pipeline".into())
            .spawn(move || {
                log::info!("speech pipeline worker started");
                let mut frame = vec![0u8; frame_bytes];
                let mut was_active = false;

                while !cancel.load(Ordering::Relaxed) {
                    frame.iter_mut().for_each(|b| *b = 0);

                    if let Err(e) = source.read(&mut frame) {
                        let mut ctx = context.lock().unwrap();
                        ctx.raise_error(e);
                        continue;
                    }

                    let mut ctx = context.lock().unwrap();
                    ctx.pre_roll.push(&frame);

                    // Stage errors are captured on the context but not
                    // dispatched yet: events for a frame go out in a fixed
                    // order — activity edges, then recognition, then errors
                    // — once the whole chain has had a chance to run, so a
                    // later stage's activity edge is never reported after an
                    // earlier stage's error for the same frame.
                    let transcript_was_empty = ctx.transcript.is_empty();
                    for stage in stages.iter_mut() {
                        if let Err(e) = stage.process(&mut ctx, &mut frame) {
                            log::warn!("stage {} error: {e}", stage.name());
                            ctx.error = Some(e);
                        }
                    }

                    let now_active = ctx.is_active;
                    if now_active && !was_active {
                        ctx.dispatch(EventKind::Activate);
                    } else if !now_active && was_active {
                        ctx.dispatch(EventKind::Deactivate);
                    }
                    was_active = now_active;

                    if !ctx.transcript.is_empty() && transcript_was_empty {
                        let kind = if ctx.is_partial {
                            EventKind::PartialRecognize
                        } else {
                            EventKind::Recognize
                        };
                        ctx.dispatch(kind);
                    }

                    if ctx.error.is_some() {
                        ctx.dispatch(EventKind::Error);
                        ctx.error = None;
                    }
                }

                log::info!("speech pipeline worker stopping");
                for stage in stages.iter_mut().rev() {
                    if let Err(e) = stage.reset() {
                        log::warn!("error resetting stage {}: {e}", stage.name());
                    }
                }
                {
                    let mut ctx = context.lock().unwrap();
                    ctx.pre_roll.clear();
                }
                for stage in stages.iter_mut().rev() {
                    if let Err(e) = stage.close() {
                        log::warn!("error closing stage {}: {e}", stage.name());
                    }
                }
                let _ = done_tx.send(());
            })
            .map_err(|e| PipelineError::config(format!("failed to spawn worker thread: {e}")))?;

        self.worker = Some(handle);
        Ok(())
    }

    /// Signal cancellation and wait up to the configured timeout for the
    /// worker to finish its current frame, reset stages in reverse order,
    /// and exit. After the timeout the worker is considered leaked; its
    /// handle is dropped without joining so `stop` never blocks past the
    /// configured timeout.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        let Some(done_rx) = self.done_rx.take() else {
            return;
        };
        match done_rx.recv_timeout(self.stop_timeout) {
            Ok(()) => {
                if let Some(handle) = self.worker.take() {
                    let _ = handle.join();
                }
            }
            Err(_) => {
                log::warn!(
                    "pipeline worker did not stop within {:?}; considered leaked",
                    self.stop_timeout
                );
                self.worker.take();
            }
        }
    }
}

impl Drop for SpeechPipeline {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_source::AudioSource;
    use crate::vad::trigger::VoiceActivityTrigger;
    use std::sync::mpsc;

    struct SilenceSource {
        frame_samples: usize,
        remaining: usize,
    }

    impl AudioSource for SilenceSource {
        fn read(&mut self, frame: &mut [u8]) -> Result<()> {
            if self.remaining == 0 {
                std::thread::sleep(Duration::from_millis(5));
                return Ok(()); // keep the loop alive without ending the thread
            }
            self.remaining -= 1;
            for b in frame.iter_mut() {
                *b = 0;
            }
            let _ = self.frame_samples;
            Ok(())
        }
    }

    struct ChannelListener(mpsc::Sender<EventKind>);
    impl crate::context::EventListener for ChannelListener {
        fn on_event(&mut self, kind: EventKind, _context: &SpeechContext) {
            let _ = self.0.send(kind);
        }
    }

    #[test]
    fn start_and_stop_cleanly() {
        let source = Box::new(SilenceSource {
            frame_samples: 160,
            remaining: 1000,
        });
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(VoiceActivityTrigger::new())];
        let mut pipeline = SpeechPipeline::new(source, stages, 160, 8, Duration::from_secs(2));
        pipeline.start().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        pipeline.stop();
    }

    #[test]
    fn set_active_takes_effect_on_next_frame() {
        let source = Box::new(SilenceSource {
            frame_samples: 160,
            remaining: 1000,
        });
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(VoiceActivityTrigger::new())];
        let mut pipeline = SpeechPipeline::new(source, stages, 160, 8, Duration::from_secs(2));
        let (tx, rx) = mpsc::channel();
        pipeline.add_listener(Box::new(ChannelListener(tx)));
        pipeline.start().unwrap();

        pipeline.set_active(true);
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(event, EventKind::Activate);
        assert!(pipeline.is_active());

        pipeline.stop();
    }
}
