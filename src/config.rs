//! Configuration loading: a string-keyed map with typed coercion helpers,
//! validated once at construction into a [`PipelineConfig`].
//!
//! The same `HashMap<String, ConfigValue>` validation path backs both a
//! text-config world (string/int/float values coerced as needed) and
//! programmatic construction via [`ConfigBuilder`]'s typed setters. Every
//! error here is a [`PipelineError::Config`] — this module never runs after
//! pipeline construction.

use crate::dsp::{AcousticNoiseSuppressor, AutomaticGainControl};
use crate::error::{PipelineError, Result};
use crate::vad::{VadConfig, VadMode, VoiceActivityDetector};
use crate::wakeword::{WakewordConfig, WindowType};
use std::collections::HashMap;
use std::str::FromStr;

/// One configuration value, coercible between int/float/string
/// representations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    fn as_i64(&self, key: &str) -> Result<i64> {
        match self {
            ConfigValue::Int(v) => Ok(*v),
            ConfigValue::Float(v) => Ok(*v as i64),
            ConfigValue::Str(s) => s
                .parse()
                .map_err(|_| PipelineError::config(format!("{key}: '{s}' is not an integer"))),
        }
    }

    fn as_f64(&self, key: &str) -> Result<f64> {
        match self {
            ConfigValue::Int(v) => Ok(*v as f64),
            ConfigValue::Float(v) => Ok(*v),
            ConfigValue::Str(s) => s
                .parse()
                .map_err(|_| PipelineError::config(format!("{key}: '{s}' is not a number"))),
        }
    }

    fn as_str(&self, _key: &str) -> Result<String> {
        Ok(match self {
            ConfigValue::Str(s) => s.clone(),
            ConfigValue::Int(v) => v.to_string(),
            ConfigValue::Float(v) => v.to_string(),
        })
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}
impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}
impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}
impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

/// Fully-resolved, validated pipeline configuration: the VAD side and the
/// wakeword side, plus the pipeline-wide knobs (`sample-rate`, `frame-width`,
/// `buffer-width`, `trace-level`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sample_rate_hz: u32,
    pub frame_width_ms: u32,
    pub buffer_width_ms: u32,
    pub trace_level: i32,
    pub vad: VadConfig,
    pub wakeword: WakewordConfig,
}

impl PipelineConfig {
    /// Pre-roll capacity in frames, derived from `buffer-width` /
    /// `frame-width`.
    pub fn pre_roll_capacity_frames(&self) -> usize {
        (self.buffer_width_ms / self.frame_width_ms.max(1)).max(1) as usize
    }

    pub fn frame_samples(&self) -> usize {
        (self.sample_rate_hz * self.frame_width_ms / 1000) as usize
    }

    /// Construct the VAD stage from this config.
    pub fn build_vad(&self) -> Result<VoiceActivityDetector> {
        VoiceActivityDetector::new(self.vad.clone())
    }

    /// Construct the noise suppressor / AGC stages from this config.
    pub fn build_noise_suppressor(&self) -> Result<AcousticNoiseSuppressor> {
        AcousticNoiseSuppressor::new(self.sample_rate_hz)
    }

    pub fn build_agc(&self) -> Result<AutomaticGainControl> {
        AutomaticGainControl::new(self.sample_rate_hz)
    }

    /// Load from a string-keyed map. Missing required keys or out-of-set
    /// enum values are `PipelineError::Config`.
    pub fn from_map(map: &HashMap<String, ConfigValue>) -> Result<Self> {
        ConfigBuilder::from_map(map)?.build()
    }
}

fn require<'a>(map: &'a HashMap<String, ConfigValue>, key: &str) -> Result<&'a ConfigValue> {
    map.get(key)
        .ok_or_else(|| PipelineError::config(format!("missing required key '{key}'")))
}

fn get_int(map: &HashMap<String, ConfigValue>, key: &str, default: i64) -> Result<i64> {
    match map.get(key) {
        Some(v) => v.as_i64(key),
        None => Ok(default),
    }
}

fn get_float(map: &HashMap<String, ConfigValue>, key: &str, default: f64) -> Result<f64> {
    match map.get(key) {
        Some(v) => v.as_f64(key),
        None => Ok(default),
    }
}

fn get_str(map: &HashMap<String, ConfigValue>, key: &str, default: &str) -> Result<String> {
    match map.get(key) {
        Some(v) => v.as_str(key),
        None => Ok(default.to_string()),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Typed setters over the same validated surface `from_map` produces —
/// convenient for programmatic construction and for tests, which lean on
/// this far more than the string map.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    sample_rate_hz: u32,
    frame_width_ms: u32,
    buffer_width_ms: u32,
    trace_level: i32,
    vad_mode: VadMode,
    vad_rise_delay_ms: u32,
    vad_fall_delay_ms: u32,
    wake_words: Vec<String>,
    wake_phrases: Vec<String>,
    wake_filter_path: String,
    wake_detect_path: String,
    wake_smooth_length_ms: u32,
    wake_phrase_length_ms: u32,
    wake_active_min_ms: u32,
    wake_active_max_ms: u32,
    rms_target: f32,
    rms_alpha: f32,
    pre_emphasis: f32,
    fft_window_size: usize,
    fft_window_type: WindowType,
    fft_hop_length_ms: u32,
    mel_frame_length_ms: u32,
    mel_frame_width: usize,
}

impl ConfigBuilder {
    pub fn new(sample_rate_hz: u32, frame_width_ms: u32, buffer_width_ms: u32) -> Self {
        Self {
            sample_rate_hz,
            frame_width_ms,
            buffer_width_ms,
            trace_level: 0,
            vad_mode: VadMode::Quality,
            vad_rise_delay_ms: 0,
            vad_fall_delay_ms: 0,
            wake_words: Vec::new(),
            wake_phrases: Vec::new(),
            wake_filter_path: String::new(),
            wake_detect_path: String::new(),
            wake_smooth_length_ms: 300,
            wake_phrase_length_ms: 500,
            wake_active_min_ms: 500,
            wake_active_max_ms: 5000,
            rms_target: 0.08,
            rms_alpha: 0.0,
            pre_emphasis: 0.0,
            fft_window_size: 512,
            fft_window_type: WindowType::Hann,
            fft_hop_length_ms: 10,
            mel_frame_length_ms: 400,
            mel_frame_width: 40,
        }
    }

    pub fn vad_mode(mut self, mode: VadMode) -> Self {
        self.vad_mode = mode;
        self
    }
    pub fn vad_delays(mut self, rise_ms: u32, fall_ms: u32) -> Self {
        self.vad_rise_delay_ms = rise_ms;
        self.vad_fall_delay_ms = fall_ms;
        self
    }
    pub fn wake_words(mut self, words: Vec<String>) -> Self {
        self.wake_words = words;
        self
    }
    pub fn wake_phrases(mut self, phrases: Vec<String>) -> Self {
        self.wake_phrases = phrases;
        self
    }
    pub fn wake_model_paths(mut self, filter_path: impl Into<String>, detect_path: impl Into<String>) -> Self {
        self.wake_filter_path = filter_path.into();
        self.wake_detect_path = detect_path.into();
        self
    }
    pub fn fft_window_size(mut self, size: usize) -> Self {
        self.fft_window_size = size;
        self
    }
    pub fn trace_level(mut self, level: i32) -> Self {
        self.trace_level = level;
        self
    }

    pub fn from_map(map: &HashMap<String, ConfigValue>) -> Result<Self> {
        let sample_rate_hz = require(map, "sample-rate")?.as_i64("sample-rate")? as u32;
        let frame_width_ms = require(map, "frame-width")?.as_i64("frame-width")? as u32;
        let buffer_width_ms = require(map, "buffer-width")?.as_i64("buffer-width")? as u32;

        let vad_mode_str = get_str(map, "vad-mode", "quality")?;
        let vad_mode = VadMode::from_str(&vad_mode_str)?;

        let wake_words_str = get_str(map, "wake-words", "")?;
        let wake_words = split_list(&wake_words_str);
        let wake_phrases_str = get_str(map, "wake-phrases", &wake_words_str)?;
        let wake_phrases = split_list(&wake_phrases_str);

        let fft_window_type_str = get_str(map, "fft-window-type", "hann")?;
        let fft_window_type = WindowType::from_str(&fft_window_type_str)?;

        Ok(Self {
            sample_rate_hz,
            frame_width_ms,
            buffer_width_ms,
            trace_level: get_int(map, "trace-level", 0)? as i32,
            vad_mode,
            vad_rise_delay_ms: get_int(map, "vad-rise-delay", 0)? as u32,
            vad_fall_delay_ms: get_int(map, "vad-fall-delay", 0)? as u32,
            wake_words,
            wake_phrases,
            wake_filter_path: get_str(map, "wake-filter-path", "")?,
            wake_detect_path: get_str(map, "wake-detect-path", "")?,
            wake_smooth_length_ms: get_int(map, "wake-smooth-length", 300)? as u32,
            wake_phrase_length_ms: get_int(map, "wake-phrase-length", 500)? as u32,
            wake_active_min_ms: get_int(map, "wake-active-min", 500)? as u32,
            wake_active_max_ms: get_int(map, "wake-active-max", 5000)? as u32,
            rms_target: get_float(map, "rms-target", 0.08)? as f32,
            rms_alpha: get_float(map, "rms-alpha", 0.0)? as f32,
            pre_emphasis: get_float(map, "pre-emphasis", 0.0)? as f32,
            fft_window_size: get_int(map, "fft-window-size", 512)? as usize,
            fft_window_type,
            fft_hop_length_ms: get_int(map, "fft-hop-length", 10)? as u32,
            mel_frame_length_ms: get_int(map, "mel-frame-length", 400)? as u32,
            mel_frame_width: get_int(map, "mel-frame-width", 40)? as usize,
        })
    }

    pub fn build(self) -> Result<PipelineConfig> {
        if self.fft_window_size % 2 != 0 {
            return Err(PipelineError::config(format!(
                "fft-window-size must be even, got {}",
                self.fft_window_size
            )));
        }
        if self.sample_rate_hz == 0 || self.frame_width_ms == 0 {
            return Err(PipelineError::config("sample-rate and frame-width must be > 0"));
        }

        let vad = VadConfig {
            sample_rate_hz: self.sample_rate_hz,
            frame_width_ms: self.frame_width_ms,
            mode: self.vad_mode,
            rise_delay_ms: self.vad_rise_delay_ms,
            fall_delay_ms: self.vad_fall_delay_ms,
        };

        let wakeword = WakewordConfig {
            sample_rate_hz: self.sample_rate_hz,
            frame_width_ms: self.frame_width_ms,
            rms_target: self.rms_target,
            rms_alpha: self.rms_alpha,
            pre_emphasis: self.pre_emphasis,
            fft_window_size: self.fft_window_size,
            fft_window_type: self.fft_window_type,
            fft_hop_length_ms: self.fft_hop_length_ms,
            mel_frame_length_ms: self.mel_frame_length_ms,
            mel_frame_width: self.mel_frame_width,
            wake_smooth_length_ms: self.wake_smooth_length_ms,
            wake_phrase_length_ms: self.wake_phrase_length_ms,
            wake_active_min_ms: self.wake_active_min_ms,
            wake_active_max_ms: self.wake_active_max_ms,
            wake_words: self.wake_words,
            wake_phrases: self.wake_phrases,
            filter_model_path: self.wake_filter_path,
            detect_model_path: self.wake_detect_path,
        };

        Ok(PipelineConfig {
            sample_rate_hz: self.sample_rate_hz,
            frame_width_ms: self.frame_width_ms,
            buffer_width_ms: self.buffer_width_ms,
            trace_level: self.trace_level,
            vad,
            wakeword,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(pairs: &[(&str, ConfigValue)]) -> HashMap<String, ConfigValue> {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn missing_required_key_is_config_error() {
        let map = map_of(&[("frame-width", ConfigValue::Int(10))]);
        assert!(PipelineConfig::from_map(&map).is_err());
    }

    #[test]
    fn odd_fft_window_size_is_config_error() {
        let map = map_of(&[
            ("sample-rate", ConfigValue::Int(16000)),
            ("frame-width", ConfigValue::Int(10)),
            ("buffer-width", ConfigValue::Int(1000)),
            ("wake-words", ConfigValue::Str("hello".into())),
            ("fft-window-size", ConfigValue::Int(513)),
        ]);
        assert!(PipelineConfig::from_map(&map).is_err());
    }

    #[test]
    fn unknown_vad_mode_is_config_error() {
        let map = map_of(&[
            ("sample-rate", ConfigValue::Int(16000)),
            ("frame-width", ConfigValue::Int(10)),
            ("buffer-width", ConfigValue::Int(1000)),
            ("vad-mode", ConfigValue::Str("turbo".into())),
        ]);
        assert!(PipelineConfig::from_map(&map).is_err());
    }

    #[test]
    fn string_coercion_parses_numeric_strings() {
        let map = map_of(&[
            ("sample-rate", ConfigValue::Str("16000".into())),
            ("frame-width", ConfigValue::Str("10".into())),
            ("buffer-width", ConfigValue::Str("1000".into())),
            ("wake-words", ConfigValue::Str("hello".into())),
        ]);
        let config = PipelineConfig::from_map(&map).unwrap();
        assert_eq!(config.sample_rate_hz, 16000);
        assert_eq!(config.pre_roll_capacity_frames(), 100);
    }

    #[test]
    fn wake_phrases_default_to_wake_words() {
        let map = map_of(&[
            ("sample-rate", ConfigValue::Int(16000)),
            ("frame-width", ConfigValue::Int(10)),
            ("buffer-width", ConfigValue::Int(1000)),
            ("wake-words", ConfigValue::Str("up, dog".into())),
        ]);
        let config = PipelineConfig::from_map(&map).unwrap();
        assert_eq!(config.wakeword.wake_words, vec!["up", "dog"]);
        assert_eq!(config.wakeword.wake_phrases, vec!["up", "dog"]);
    }

    #[test]
    fn builder_round_trips_without_string_map() {
        let config = ConfigBuilder::new(16000, 10, 1000)
            .wake_words(vec!["hello".to_string()])
            .vad_delays(20, 50)
            .build()
            .unwrap();
        assert_eq!(config.vad.rise_delay_ms, 20);
        assert_eq!(config.vad.fall_delay_ms, 50);
    }
}
