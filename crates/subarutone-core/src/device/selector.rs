//! Microphone selection heuristic
//!
//! Some platforms never make an external instrument cable the default input
//! and hide device labels until microphone permission is granted. The
//! selector therefore:
//!
//! 1. Opens a provisional stream on the default device (grants permission)
//! 2. Enumerates inputs and looks for a preferred label (exact match)
//! 3. Re-opens pinned to that device if it is not the provisional one
//! 4. Falls back to the first enumerated input otherwise
//!
//! Any stream opened along the way is stopped before an error is returned.

use crate::config::SessionConfig;

use super::error::{DeviceError, DeviceResult};
use super::{DeviceHost, DeviceInfo, InputStream, StreamConstraints};

/// Hint appended to the device report
pub const REPORT_HINT: &str =
    "If your instrument is connected but not recognized, please send this device list to the developer.";

/// Outcome of a successful selection
pub struct MicrophoneSelection<S> {
    /// The active microphone stream
    pub stream: S,
    /// Device the stream is bound to
    pub selected: DeviceInfo,
    /// Every enumerated audio input, in platform order
    pub inputs: Vec<DeviceInfo>,
    /// Whether `selected` matched a preferred label
    pub matched_preferred: bool,
}

impl<S> MicrophoneSelection<S> {
    /// User-facing diagnostic listing every input, selected one starred
    pub fn report(&self) -> String {
        let labels: Vec<String> = self
            .inputs
            .iter()
            .map(|device| {
                if device.id == self.selected.id {
                    format!("*{}", device.label)
                } else {
                    device.label.clone()
                }
            })
            .collect();
        format!("Input devices: {}. {}", labels.join(" / "), REPORT_HINT)
    }
}

/// Pick and open the microphone for otamatone mode
pub async fn select_microphone<H: DeviceHost>(
    host: &H,
    config: &SessionConfig,
) -> DeviceResult<MicrophoneSelection<H::Stream>> {
    let constraints = StreamConstraints::raw();
    let mut provisional = host.open_input(&constraints).await?;

    let devices = match host.enumerate_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            provisional.stop();
            return Err(e);
        }
    };
    let inputs: Vec<DeviceInfo> = devices.into_iter().filter(DeviceInfo::is_audio_input).collect();
    log::debug!(
        "Enumerated {} input devices: {:?}",
        inputs.len(),
        inputs.iter().map(|d| d.label.as_str()).collect::<Vec<_>>()
    );

    let preferred = inputs
        .iter()
        .find(|device| config.is_preferred_microphone(&device.label));
    let matched_preferred = preferred.is_some();
    let Some(selected) = preferred.or_else(|| inputs.first()).cloned() else {
        provisional.stop();
        return Err(DeviceError::NotFound);
    };

    let stream = if provisional.device_id() == selected.id {
        provisional
    } else {
        provisional.stop();
        log::debug!("Re-opening input pinned to '{}'", selected.label);
        host.open_input(&constraints.pinned(selected.id.clone()))
            .await?
    };

    log::info!(
        "Selected microphone '{}'{}",
        selected.label,
        if matched_preferred { " (preferred label)" } else { "" }
    );

    Ok(MicrophoneSelection {
        stream,
        selected,
        inputs,
        matched_preferred,
    })
}
