//! Audio backend configuration
//!
//! Output device selection and stream settings for the cpal backend.

use serde::{Deserialize, Serialize};

/// Audio device identifier
///
/// Includes both the device name and the host backend (ALSA, CoreAudio, etc.)
/// so devices can be picked from a specific host on systems that have several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g., "ALSA", "CoreAudio")
    /// If None, the default host is searched first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub output_device: Option<DeviceId>,

    /// Preferred sample rate (None = device default)
    pub sample_rate: Option<u32>,

    /// Request a hardware buffer of exactly one quantum
    ///
    /// Falls back to the device's default buffer size if refused.
    pub fixed_buffer: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_device: None,
            sample_rate: None,
            fixed_buffer: true,
        }
    }
}
