//! Demo binary: wires `VoiceActivityDetector` -> `WakewordTrigger` over a
//! live microphone and prints dispatched lifecycle events to stdout.

use clap::Parser;
use log::info;
use speech_pipeline_core::audio_source::cpal_source::{CpalAudioSource, CpalSourceConfig};
use speech_pipeline_core::audio_source::AudioSource;
use speech_pipeline_core::context::{EventKind, EventListener, SpeechContext};
use speech_pipeline_core::models::tflite::TfliteModelRunner;
use speech_pipeline_core::stage::Stage;
use speech_pipeline_core::vad::{VadConfig, VoiceActivityDetector};
use speech_pipeline_core::wakeword::{WakewordConfig, WakewordTrigger};
use speech_pipeline_core::SpeechPipeline;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pipeline-demo")]
#[command(about = "Microphone demo for the VAD + wakeword trigger stage chain")]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Input device name; default device when omitted.
    #[arg(long)]
    device: Option<String>,

    /// Comma-separated wake words, e.g. "hello,goodbye".
    #[arg(long)]
    wake_words: String,

    /// Path to the mel filterbank model (model A).
    #[arg(long)]
    filter_model: String,

    /// Path to the classifier model (model B).
    #[arg(long)]
    detect_model: String,

    /// Sample rate in Hz.
    #[arg(long, default_value_t = 16000)]
    sample_rate: u32,

    /// Frame width in milliseconds.
    #[arg(long, default_value_t = 10)]
    frame_width_ms: u32,
}

struct StdoutListener;

impl EventListener for StdoutListener {
    fn on_event(&mut self, kind: EventKind, context: &SpeechContext) {
        match kind {
            EventKind::Activate => println!("[ACTIVATE]"),
            EventKind::Deactivate => println!("[DEACTIVATE]"),
            EventKind::Timeout => println!("[TIMEOUT]"),
            EventKind::Error => println!("[ERROR] {:?}", context.error),
            EventKind::Recognize | EventKind::PartialRecognize => {
                println!("[RECOGNIZE] {:?}", context.transcript)
            }
            EventKind::Trace => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("starting pipeline demo");

    let wake_words: Vec<String> = args
        .wake_words
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let frame_samples = (args.sample_rate * args.frame_width_ms / 1000) as usize;

    let vad = VoiceActivityDetector::new(VadConfig {
        sample_rate_hz: args.sample_rate,
        frame_width_ms: args.frame_width_ms,
        ..VadConfig::default()
    })?;

    let wakeword_config = WakewordConfig {
        sample_rate_hz: args.sample_rate,
        frame_width_ms: args.frame_width_ms,
        wake_words: wake_words.clone(),
        filter_model_path: args.filter_model.clone(),
        detect_model_path: args.detect_model.clone(),
        ..WakewordConfig::default()
    };

    let half_spectrum = wakeword_config.fft_window_size / 2 + 1;
    let mel_model = Box::new(TfliteModelRunner::new(
        &args.filter_model,
        half_spectrum,
        wakeword_config.mel_frame_width,
    )?);
    let mel_length = wakeword_config.mel_frame_length_ms / wakeword_config.fft_hop_length_ms;
    let classifier_model = Box::new(TfliteModelRunner::new(
        &args.detect_model,
        mel_length as usize * wakeword_config.mel_frame_width,
        wake_words.len() + 1,
    )?);
    let wakeword = WakewordTrigger::new(wakeword_config, mel_model, classifier_model)?;

    let source: Box<dyn AudioSource> = Box::new(CpalAudioSource::new(CpalSourceConfig {
        device_name: args.device,
        channel: 0,
        sample_rate_hz: args.sample_rate,
    })?);

    let stages: Vec<Box<dyn Stage>> = vec![Box::new(vad), Box::new(wakeword)];
    let mut pipeline = SpeechPipeline::new(source, stages, frame_samples, 100, Duration::from_secs(2));
    pipeline.add_listener(Box::new(StdoutListener));
    pipeline.start()?;

    info!("listening for: {:?} (ctrl-c to stop)", wake_words);
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}
