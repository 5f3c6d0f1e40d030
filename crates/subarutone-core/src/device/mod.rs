//! Input devices and microphone selection
//!
//! The platform side is abstracted behind [`DeviceHost`] (enumerate, open)
//! and [`InputStream`] (the acquired stream). [`select_microphone`] runs the
//! selection heuristic on top of any host; the cpal implementation lives in
//! [`crate::audio`].

mod error;
mod selector;

use std::future::Future;

use crate::graph::CaptureFeed;

pub use error::{DeviceError, DeviceResult};
pub use selector::{select_microphone, MicrophoneSelection, REPORT_HINT};

/// Kind of a media device as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    AudioInput,
    AudioOutput,
    VideoInput,
}

/// One enumerated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl DeviceInfo {
    pub fn audio_input(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: DeviceKind::AudioInput,
        }
    }

    #[inline]
    pub fn is_audio_input(&self) -> bool {
        self.kind == DeviceKind::AudioInput
    }
}

/// Constraints for opening an input stream
///
/// Signal processing is off by default: gain control, echo cancellation
/// and noise suppression all mangle an instrument signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Pin the stream to this device; `None` means the platform default
    pub device_id: Option<String>,
    pub auto_gain_control: bool,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

impl StreamConstraints {
    /// Default device, all processing disabled
    pub fn raw() -> Self {
        Self {
            device_id: None,
            auto_gain_control: false,
            echo_cancellation: false,
            noise_suppression: false,
        }
    }

    /// Same constraints, pinned to `device_id`
    pub fn pinned(&self, device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..self.clone()
        }
    }
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self::raw()
    }
}

/// An acquired microphone stream
pub trait InputStream {
    /// Id of the device the stream is bound to
    fn device_id(&self) -> &str;

    /// Hand over the capture ring (once)
    fn take_capture(&mut self) -> Option<CaptureFeed>;

    /// Release the hardware; idempotent
    fn stop(&mut self);
}

/// Platform device access
///
/// Futures are not required to be `Send`.
pub trait DeviceHost {
    type Stream: InputStream;

    /// List all media devices
    fn enumerate_devices(&self) -> impl Future<Output = DeviceResult<Vec<DeviceInfo>>>;

    /// Open an input stream
    fn open_input(
        &self,
        constraints: &StreamConstraints,
    ) -> impl Future<Output = DeviceResult<Self::Stream>>;
}
