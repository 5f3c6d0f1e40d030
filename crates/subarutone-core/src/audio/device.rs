//! Audio device lookup
//!
//! Output devices are searched across ALL available cpal hosts so a device
//! can be pinned to a specific backend. Input devices are looked up on the
//! default host only, which is where the platform's permission prompt and
//! its "external microphone" routing live.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Get a human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

/// Get a host by its name string
fn get_host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|&host_id| host_name(host_id) == name)
        .and_then(|host_id| cpal::host_from_id(host_id).ok())
}

/// Find an output device by its ID
///
/// Uses the host named in the DeviceId if available, otherwise searches
/// all hosts.
pub fn find_output_device(id: &DeviceId) -> AudioResult<cpal::Device> {
    if let Some(host) = id.host.as_deref().and_then(get_host_by_name) {
        return host
            .output_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name))
            .ok_or_else(|| AudioError::DeviceNotFound(id.name.clone()));
    }

    cpal::available_hosts()
        .into_iter()
        .filter_map(|host_id| cpal::host_from_id(host_id).ok())
        .filter_map(|host| host.output_devices().ok())
        .flatten()
        .find(|d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name))
        .ok_or_else(|| AudioError::DeviceNotFound(id.name.clone()))
}

/// Get the default output device of the default host
pub fn default_output_device() -> AudioResult<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::NoDefaultDevice("No default output device".to_string()))
}

/// Names of the default host's input devices, in platform order
pub fn input_device_names() -> AudioResult<Vec<String>> {
    let devices = cpal::default_host()
        .input_devices()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Find an input device of the default host by name
pub fn find_input_device(name: &str) -> AudioResult<cpal::Device> {
    cpal::default_host()
        .input_devices()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .find(|d: &cpal::Device| d.name().ok().as_deref() == Some(name))
        .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))
}

/// Get the default input device of the default host
pub fn default_input_device() -> Option<cpal::Device> {
    cpal::default_host().default_input_device()
}
