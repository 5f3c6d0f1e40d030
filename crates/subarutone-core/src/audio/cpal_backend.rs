//! CPAL output graph
//!
//! The output stream's callback owns the [`RenderHost`] exclusively:
//!
//! ```text
//! ┌──────────────────┐  ControlMessage / GraphCommand  ┌─────────────────────┐
//! │  Mode Controller │───────push() (lock-free)───────►│  CPAL Audio Thread  │
//! │ (control thread) │                                 │  (owns RenderHost)  │
//! └────────┬─────────┘                                 └──────────┬──────────┘
//!          │ FrequencyParam (relaxed atomic)                      │
//!          └──────────────────────────────────────────────────────┘
//! ```
//!
//! The stream asks for a hardware buffer of exactly one quantum; when the
//! device refuses, the host's quantum adapter absorbs whatever size it gets.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::config::AudioConfig;
use super::device::{default_output_device, find_output_device};
use super::error::{AudioError, AudioResult};
use crate::bridge::RenderHost;
use crate::graph::{AudioGraph, GraphError, GraphResult};

/// Output side of a session on a cpal device
///
/// Dropping or closing it stops the stream and drops the render host.
pub struct CpalGraph {
    device: cpal::Device,
    stream_config: StreamConfig,
    fixed_buffer: bool,
    stream: Option<Stream>,
    closed: bool,
}

impl CpalGraph {
    /// Open the configured (or default) output device
    pub fn open(config: &AudioConfig, quantum_length: usize) -> AudioResult<Self> {
        let device = match &config.output_device {
            Some(id) => find_output_device(id)?,
            None => default_output_device()?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio output device: {}", device_name);

        let supported = get_output_config(&device, config)?;
        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: CpalBufferSize::Fixed(quantum_length as u32),
        };

        log::info!(
            "Audio config: {} channels, {}Hz, quantum {} frames (~{:.1}ms)",
            stream_config.channels,
            stream_config.sample_rate.0,
            quantum_length,
            quantum_length as f32 / stream_config.sample_rate.0 as f32 * 1000.0
        );

        Ok(Self {
            device,
            stream_config,
            fixed_buffer: config.fixed_buffer,
            stream: None,
            closed: false,
        })
    }

    /// Number of interleaved output channels
    pub fn channels(&self) -> u16 {
        self.stream_config.channels
    }

    fn build_stream(&self, config: &StreamConfig, mut host: RenderHost) -> AudioResult<Stream> {
        let channels = config.channels as usize;
        host.prepare(channels);

        self.device
            .build_output_stream(
                config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    host.render(data, channels);
                },
                move |err| {
                    log::error!("Output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))
    }
}

impl AudioGraph for CpalGraph {
    fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate.0
    }

    fn start(&mut self, host: RenderHost) -> GraphResult<()> {
        if self.closed {
            return Err(GraphError::Closed);
        }
        if self.stream.is_some() {
            return Err(GraphError::AlreadyStarted);
        }

        // The render host moves into the callback, so one build attempt only;
        // a refused fixed size is checked up front against the supported range
        let mut config = self.stream_config.clone();
        if !self.fixed_buffer || !supports_buffer_size(&self.device, &config) {
            log::debug!("Using the device's default buffer size");
            config.buffer_size = CpalBufferSize::Default;
        }

        let stream = self.build_stream(&config, host)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
        self.stream = Some(stream);
        log::info!("Audio output stream started");
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Failed to pause output stream: {}", e);
            }
            drop(stream);
            log::info!("Audio output stream closed");
        }
    }
}

impl Drop for CpalGraph {
    fn drop(&mut self) {
        self.close();
    }
}

/// Whether the device's f32 configs accept the requested fixed buffer size
fn supports_buffer_size(device: &cpal::Device, config: &StreamConfig) -> bool {
    let CpalBufferSize::Fixed(frames) = config.buffer_size else {
        return true;
    };
    let Ok(mut configs) = device.supported_output_configs() else {
        return false;
    };
    configs.any(|c| {
        c.channels() == config.channels
            && c.sample_format() == SampleFormat::F32
            && match c.buffer_size() {
                cpal::SupportedBufferSize::Range { min, max } => (*min..=*max).contains(&frames),
                cpal::SupportedBufferSize::Unknown => true,
            }
    })
}

/// Get the best f32 output configuration for a device
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let default = device
        .default_output_config()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;
    let target_sample_rate = config.sample_rate.unwrap_or(default.sample_rate().0);

    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    if supported_configs.is_empty() {
        return Err(AudioError::UnsupportedFormat(
            "device has no f32 output configuration".to_string(),
        ));
    }

    let in_range = |c: &&cpal::SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };

    // Prefer the device's default channel count at the target rate
    let best = supported_configs
        .iter()
        .filter(in_range)
        .find(|c| c.channels() == default.channels())
        .or_else(|| supported_configs.iter().find(in_range))
        .cloned();

    match best {
        Some(range) => Ok(range.with_sample_rate(cpal::SampleRate(target_sample_rate))),
        None => {
            let fallback = supported_configs[0].clone().with_max_sample_rate();
            log::warn!(
                "Audio device doesn't support {}Hz, falling back to {}Hz",
                target_sample_rate,
                fallback.sample_rate().0
            );
            Ok(fallback)
        }
    }
}
