//! End-to-end scenario suite for the wakeword trigger: activation, VAD-gated
//! deactivation, minimum-active enforcement, max-activation timeout, exact
//! phrase-order matching, and phrase-window reset on silence. A simple
//! activation scenario is covered by the inline unit test in
//! `src/wakeword/mod.rs`; these continue from the same tiny 16kHz/10ms/160
//! fft-window configuration so frame counts stay easy to reason about.
//!
//! Only the literally-described outcome of each scenario is asserted. The
//! VAD-gated deactivation case in particular can also produce a `TIMEOUT` on
//! the same frame as `DEACTIVATE` depending on exact frame counts, so only
//! `DEACTIVATE`/`is_active == false` is checked for it.

use speech_pipeline_core::context::{EventKind, SpeechContext};
use speech_pipeline_core::models::mock::{FixedModelRunner, PassthroughModelRunner};
use speech_pipeline_core::stage::Stage;
use speech_pipeline_core::test_support::VecEventSink;
use speech_pipeline_core::wakeword::{WakewordConfig, WakewordTrigger};

fn frame_of(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_ne_bytes()).collect()
}

/// A tiny two-class configuration: 10ms frames at 16kHz, an 160-sample FFT
/// window equal to one audio frame, single-frame smoothing, a two-frame
/// phrase window.
fn two_class_trigger(script: Vec<Vec<f32>>) -> WakewordTrigger {
    let config = WakewordConfig {
        sample_rate_hz: 16000,
        frame_width_ms: 10,
        fft_window_size: 160,
        fft_hop_length_ms: 10,
        mel_frame_length_ms: 40,
        mel_frame_width: 40,
        wake_smooth_length_ms: 10,
        wake_phrase_length_ms: 20,
        wake_active_min_ms: 20,
        wake_active_max_ms: 30,
        wake_words: vec!["hello".to_string()],
        ..WakewordConfig::default()
    };
    build_trigger(config, script)
}

/// A three-class configuration: two wake words ("up", "dog") with an
/// explicit "up dog" phrase and a 3-frame phrase window.
fn three_class_trigger(wake_phrases: Vec<String>, phrase_length_ms: u32, script: Vec<Vec<f32>>) -> WakewordTrigger {
    let config = WakewordConfig {
        sample_rate_hz: 16000,
        frame_width_ms: 10,
        fft_window_size: 160,
        fft_hop_length_ms: 10,
        mel_frame_length_ms: 40,
        mel_frame_width: 40,
        wake_smooth_length_ms: 10,
        wake_phrase_length_ms: phrase_length_ms,
        wake_active_min_ms: 20,
        wake_active_max_ms: 30,
        wake_words: vec!["up".to_string(), "dog".to_string()],
        wake_phrases,
        ..WakewordConfig::default()
    };
    build_trigger(config, script)
}

fn build_trigger(config: WakewordConfig, script: Vec<Vec<f32>>) -> WakewordTrigger {
    let half_spectrum = config.fft_window_size / 2 + 1;
    let mel_length = (config.mel_frame_length_ms / config.fft_hop_length_ms) as usize;
    let num_classes = config.wake_words.len() + 1;
    let mel_model = Box::new(PassthroughModelRunner::new(half_spectrum, config.mel_frame_width));
    let classifier_model = Box::new(FixedModelRunner::new(
        mel_length * config.mel_frame_width,
        num_classes,
        script,
    ));
    WakewordTrigger::new(config, mel_model, classifier_model).unwrap()
}

fn speech_frame() -> Vec<u8> {
    frame_of(&[100i16; 160])
}

fn activate_two_class_trigger(trigger: &mut WakewordTrigger, ctx: &mut SpeechContext) {
    ctx.is_speech = true;
    trigger.process(ctx, &mut speech_frame()).unwrap();
    assert!(!ctx.is_active, "first frame must not yet activate");
    trigger.process(ctx, &mut speech_frame()).unwrap();
    assert!(ctx.is_active, "second frame must activate");
}

#[test]
fn vad_gated_deactivation_after_activation() {
    let mut trigger = two_class_trigger(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    let mut ctx = SpeechContext::new(4);
    let mut sink = VecEventSink::new();
    ctx.add_listener(Box::new(sink.clone()));

    activate_two_class_trigger(&mut trigger, &mut ctx);

    ctx.is_speech = true;
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();
    ctx.is_speech = false;
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();

    assert!(!ctx.is_active);
}

#[test]
fn minimum_active_enforcement_suppresses_immediate_fall() {
    let mut trigger = two_class_trigger(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    let mut ctx = SpeechContext::new(4);

    activate_two_class_trigger(&mut trigger, &mut ctx);

    // Immediately fall silent: active_length becomes 2, equal to (not past)
    // min_active_frames == 2, so VAD-fall deactivation stays suppressed.
    ctx.is_speech = false;
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();
    assert!(ctx.is_active, "deactivation must not fire at active_length == min");
}

#[test]
fn max_activation_timeout() {
    let mut trigger = two_class_trigger(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    let mut ctx = SpeechContext::new(4);
    let mut sink = VecEventSink::new();
    ctx.add_listener(Box::new(sink.clone()));

    activate_two_class_trigger(&mut trigger, &mut ctx);

    ctx.is_speech = true;
    for _ in 0..4 {
        trigger.process(&mut ctx, &mut speech_frame()).unwrap();
    }

    assert!(!ctx.is_active, "must have timed out and deactivated by now");
    let events = sink.events();
    let timeout_pos = events.iter().position(|e| *e == EventKind::Timeout);
    assert!(timeout_pos.is_some(), "TIMEOUT must have been dispatched");
}

#[test]
fn exact_phrase_only_rejects_wrong_order_then_accepts_correct_order() {
    let mut trigger = three_class_trigger(vec!["up dog".to_string()], 30, vec![
        vec![0.0, 0.0, 1.0], // dog
        vec![0.0, 1.0, 0.0], // up
        vec![1.0, 0.0, 0.0], // null
        vec![0.0, 1.0, 0.0], // up
        vec![0.0, 0.0, 1.0], // dog
        vec![1.0, 0.0, 0.0], // null
    ]);
    let mut ctx = SpeechContext::new(4);
    ctx.is_speech = true;

    for _ in 0..3 {
        trigger.process(&mut ctx, &mut speech_frame()).unwrap();
    }
    assert!(!ctx.is_active, "dog-up-null is the wrong order and must not activate");

    for _ in 0..3 {
        trigger.process(&mut ctx, &mut speech_frame()).unwrap();
    }
    assert!(ctx.is_active, "up-dog-null is the configured phrase and must activate");
}

#[test]
fn phrase_window_resets_on_silence() {
    let mut trigger = three_class_trigger(vec!["up dog".to_string()], 30, vec![
        vec![0.0, 1.0, 0.0], // up (speech)
        vec![0.0, 0.0, 1.0], // dog (speech, after the silence reset)
        vec![1.0, 0.0, 0.0], // null (speech)
    ]);
    let mut ctx = SpeechContext::new(4);

    ctx.is_speech = true;
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();

    ctx.is_speech = false;
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();

    ctx.is_speech = true;
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();
    trigger.process(&mut ctx, &mut speech_frame()).unwrap();

    assert!(!ctx.is_active, "the VAD fall must have reset phrase state, losing the earlier 'up'");
}
