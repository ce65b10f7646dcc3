//! [`CpalAudioSource`]: live microphone capture via `cpal`, resampled to a
//! fixed output rate with `rubato` when the hardware doesn't natively
//! support it. Behind the `mic` feature.
//!
//! A dedicated capture thread owns the `cpal` stream and feeds a bounded
//! channel; `AudioSource::read` is pull-oriented, so it just blocks on
//! `recv` and copies bytes out of the channel into the caller's frame
//! buffer.

use super::AudioSource;
use crate::error::{PipelineError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample};
use crossbeam::channel::{bounded, Receiver, Sender};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CpalSourceConfig {
    /// `None` selects the host's default input device.
    pub device_name: Option<String>,
    /// 0-based input channel to capture; other channels are discarded.
    pub channel: u32,
    /// Output sample rate; the capture is resampled to this rate when the
    /// hardware's native rate differs.
    pub sample_rate_hz: u32,
}

impl Default for CpalSourceConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            channel: 0,
            sample_rate_hz: 16000,
        }
    }
}

/// Live microphone capture, resampled to `sample_rate_hz` mono s16le.
pub struct CpalAudioSource {
    receiver: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    stop_sender: Sender<()>,
    _handle: thread::JoinHandle<()>,
}

const RESAMPLE_CHUNK: usize = 1024;

impl CpalAudioSource {
    pub fn new(config: CpalSourceConfig) -> Result<Self> {
        let (sender, receiver) = bounded(100);
        let (stop_sender, stop_receiver) = bounded(1);
        let spawn_config = config.clone();

        let handle = thread::Builder::new()
            .name("cpal-audio-source".into())
            .spawn(move || {
                if let Err(e) = Self::run_capture_thread(spawn_config, sender, stop_receiver) {
                    log::error!("audio capture thread failed: {e}");
                }
            })
            .map_err(|e| PipelineError::dsp(format!("failed to spawn capture thread: {e}")))?;

        // Give cpal a moment to open the stream before the first read blocks.
        thread::sleep(Duration::from_millis(50));

        Ok(Self {
            receiver,
            pending: Vec::new(),
            stop_sender,
            _handle: handle,
        })
    }

    fn run_capture_thread(
        config: CpalSourceConfig,
        sender: Sender<Vec<u8>>,
        stop_receiver: Receiver<()>,
    ) -> Result<()> {
        let host = cpal::default_host();
        let device = match &config.device_name {
            Some(name) => host
                .devices()
                .map_err(|e| PipelineError::dsp(e.to_string()))?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| PipelineError::dsp(format!("input device not found: {name}")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| PipelineError::dsp("no default input device"))?,
        };

        let supported = device
            .default_input_config()
            .map_err(|e| PipelineError::dsp(e.to_string()))?;
        let stream_config = supported.config();
        let hardware_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;

        if config.channel >= channels as u32 {
            return Err(PipelineError::config(format!(
                "channel {} not available ({} channel device)",
                config.channel, channels
            )));
        }

        let resampler = if hardware_rate != config.sample_rate_hz {
            let ratio = config.sample_rate_hz as f64 / hardware_rate as f64;
            let params = SincInterpolationParameters {
                sinc_len: 32,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 128,
                window: WindowFunction::BlackmanHarris2,
            };
            let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
                .map_err(|e| PipelineError::dsp(e.to_string()))?;
            Some(Arc::new(Mutex::new(resampler)))
        } else {
            None
        };

        let err_fn = |err| log::error!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, config.channel, channels, sender, resampler, err_fn)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, config.channel, channels, sender, resampler, err_fn)?,
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, config.channel, channels, sender, resampler, err_fn)?,
            other => return Err(PipelineError::config(format!("unsupported sample format: {other:?}"))),
        };

        stream.play().map_err(|e| PipelineError::dsp(e.to_string()))?;

        loop {
            if stop_receiver.try_recv().is_ok() {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn build_stream<T>(
        device: &Device,
        stream_config: &cpal::StreamConfig,
        channel: u32,
        channels: usize,
        sender: crossbeam::channel::Sender<Vec<u8>>,
        resampler: Option<Arc<Mutex<SincFixedIn<f32>>>>,
        err_fn: impl FnMut(cpal::StreamError) + Send + 'static + Copy,
    ) -> Result<cpal::Stream>
    where
        T: Sample + SizedSample + Send + Sync + 'static,
        f32: FromSample<T>,
    {
        let mut accum = Vec::new();
        device
            .build_input_stream(
                stream_config,
                move |data: &[T], _| {
                    for frame in data.chunks(channels) {
                        if let Some(s) = frame.get(channel as usize) {
                            accum.push(f32::from_sample(*s));
                        }
                    }
                    while accum.len() >= RESAMPLE_CHUNK {
                        let chunk: Vec<f32> = accum.drain(..RESAMPLE_CHUNK).collect();
                        let output = match &resampler {
                            Some(r) => match r.lock().unwrap().process(&[chunk], None) {
                                Ok(channels) => channels[0].clone(),
                                Err(e) => {
                                    log::error!("resampling error: {e}");
                                    continue;
                                }
                            },
                            None => chunk,
                        };
                        let bytes: Vec<u8> = output
                            .iter()
                            .flat_map(|s| {
                                let clamped = s.clamp(-1.0, 1.0);
                                ((clamped * i16::MAX as f32) as i16).to_ne_bytes()
                            })
                            .collect();
                        let _ = sender.try_send(bytes);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| PipelineError::dsp(e.to_string()))
    }
}

impl Drop for CpalAudioSource {
    fn drop(&mut self) {
        let _ = self.stop_sender.send(());
    }
}

impl AudioSource for CpalAudioSource {
    fn read(&mut self, frame: &mut [u8]) -> Result<()> {
        while self.pending.len() < frame.len() {
            let chunk = self
                .receiver
                .recv()
                .map_err(|_| PipelineError::dsp("capture thread disconnected"))?;
            self.pending.extend_from_slice(&chunk);
        }
        let rest = self.pending.split_off(frame.len());
        frame.copy_from_slice(&self.pending);
        self.pending = rest;
        Ok(())
    }
}
