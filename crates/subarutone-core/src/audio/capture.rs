//! CPAL microphone capture
//!
//! Each input stream pushes channel 0 of its callback into a lock-free ring
//! that the render host drains one quantum at a time:
//!
//! ```text
//! ┌─────────────────────┐   f32 samples (rtrb SPSC)   ┌─────────────────────┐
//! │ CPAL Input Thread   │────────────────────────────►│  CPAL Output Thread │
//! │ (CpalInputStream)   │   full ring drops samples   │  (RenderHost)       │
//! └─────────────────────┘                             └─────────────────────┘
//! ```
//!
//! cpal exposes no stable device ids, so the device name doubles as id and
//! label. It also has no gain-control/echo/noise toggles; capture is always
//! the raw device signal.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::device::{default_input_device, find_input_device, input_device_names};
use crate::device::{DeviceError, DeviceHost, DeviceInfo, DeviceResult, InputStream, StreamConstraints};
use crate::graph::CaptureFeed;
use crate::types::Sample;

/// Device host backed by cpal's default host
pub struct CpalDeviceHost {
    sample_rate: u32,
    capture_capacity: usize,
}

impl CpalDeviceHost {
    /// Streams are opened at `sample_rate` (the output graph's rate) with a
    /// capture ring of `capture_capacity` samples
    pub fn new(sample_rate: u32, capture_capacity: usize) -> Self {
        Self {
            sample_rate,
            capture_capacity,
        }
    }
}

impl DeviceHost for CpalDeviceHost {
    type Stream = CpalInputStream;

    async fn enumerate_devices(&self) -> DeviceResult<Vec<DeviceInfo>> {
        // Device probing can block for a long time on some backends
        let names = tokio::task::spawn_blocking(input_device_names)
            .await
            .map_err(|e| DeviceError::AcquisitionFailed(e.to_string()))?
            .map_err(|e| DeviceError::from_backend_message(e.to_string()))?;
        Ok(names
            .into_iter()
            .map(|name| DeviceInfo::audio_input(name.clone(), name))
            .collect())
    }

    async fn open_input(&self, constraints: &StreamConstraints) -> DeviceResult<CpalInputStream> {
        let device = match &constraints.device_id {
            Some(id) => find_input_device(id).map_err(|e| DeviceError::AcquisitionFailed(e.to_string()))?,
            None => default_input_device().ok_or(DeviceError::NotFound)?,
        };
        CpalInputStream::open(device, self.sample_rate, self.capture_capacity, constraints)
    }
}

/// A running cpal input stream
pub struct CpalInputStream {
    device_id: String,
    stream: Option<Stream>,
    capture: Option<CaptureFeed>,
}

impl CpalInputStream {
    fn open(
        device: cpal::Device,
        sample_rate: u32,
        capture_capacity: usize,
        constraints: &StreamConstraints,
    ) -> DeviceResult<Self> {
        let name = device
            .name()
            .map_err(|e| DeviceError::from_backend_message(e.to_string()))?;
        log::debug!(
            "Opening input '{}' at {}Hz (agc: {}, echo cancellation: {}, noise suppression: {})",
            name,
            sample_rate,
            constraints.auto_gain_control,
            constraints.echo_cancellation,
            constraints.noise_suppression
        );

        let config = input_config(&device, sample_rate)?;
        let channels = usize::from(config.channels);
        let (mut producer, capture) = rtrb::RingBuffer::<Sample>::new(capture_capacity);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        // Render side is behind; drop the rest of this callback
                        if producer.push(frame[0]).is_err() {
                            break;
                        }
                    }
                },
                move |err| {
                    log::error!("Input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| DeviceError::from_backend_message(e.to_string()))?;
        stream
            .play()
            .map_err(|e| DeviceError::from_backend_message(e.to_string()))?;

        log::info!("Microphone stream started on '{}'", name);
        Ok(Self {
            device_id: name,
            stream: Some(stream),
            capture: Some(capture),
        })
    }
}

impl InputStream for CpalInputStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn take_capture(&mut self) -> Option<CaptureFeed> {
        self.capture.take()
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Failed to pause input stream: {}", e);
            }
            log::info!("Microphone stream on '{}' stopped", self.device_id);
        }
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// An f32 input configuration at `sample_rate`
fn input_config(device: &cpal::Device, sample_rate: u32) -> DeviceResult<StreamConfig> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| DeviceError::from_backend_message(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .find(|c| sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0)
        .ok_or_else(|| {
            DeviceError::AcquisitionFailed(format!("no f32 input configuration at {}Hz", sample_rate))
        })?;
    Ok(supported
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .config())
}
