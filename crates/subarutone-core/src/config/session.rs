//! Session configuration
//!
//! Everything that used to be module-level constants (quantum length,
//! microphone labels, queue sizes) lives in one immutable struct that is
//! built once at session start and shared read-only.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::types::{QUANTUM_LENGTH, SUBARU_VOICE_ID};

/// Microphone labels preferred over the default input device
///
/// Some platforms (notably iOS) never make an external instrument cable the
/// default input, so the selector looks for these exact labels first.
pub const DEFAULT_MICROPHONE_LABELS: [&str; 4] = [
    "外部マイク",
    "ヘッドセットマイク",
    "Microphone Input",
    "Headset Microphone",
];

/// Errors returned by [`SessionConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Quantum length must be greater than zero")]
    ZeroQuantum,

    #[error("Queue capacity `{0}` must be greater than zero")]
    ZeroCapacity(&'static str),
}

/// Immutable configuration of one voice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frames per quantum; constant for the session's lifetime
    pub quantum_length: usize,

    /// Voice the engine is initialized with
    pub voice_id: u32,

    /// Exact input-device labels preferred by the microphone selector
    pub microphone_labels: Vec<String>,

    /// Capacity of the control -> render message queue
    pub control_queue_capacity: usize,

    /// Capacity of the render -> control message channel
    pub render_queue_capacity: usize,

    /// Capacity of the graph attach/detach queue
    pub graph_queue_capacity: usize,

    /// Capacity of a microphone capture ring, in quanta
    pub capture_queue_quanta: usize,

    /// How long `initialize_session` waits for the engine's `ready`
    pub ready_timeout_ms: u64,

    /// Poll period while waiting on the render context
    pub event_poll_interval_ms: u64,

    /// Forward the engine's debug-level diagnostics as log messages
    pub forward_engine_debug: bool,

    /// Hardware backend settings
    pub audio: AudioConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quantum_length: QUANTUM_LENGTH,
            voice_id: SUBARU_VOICE_ID,
            microphone_labels: DEFAULT_MICROPHONE_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            control_queue_capacity: 64,
            render_queue_capacity: 1024,
            graph_queue_capacity: 16,
            capture_queue_quanta: 8,
            ready_timeout_ms: 10_000,
            event_poll_interval_ms: 5,
            forward_engine_debug: true,
            audio: AudioConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Config for a specific voice, everything else default
    pub fn with_voice(voice_id: u32) -> Self {
        Self {
            voice_id,
            ..Default::default()
        }
    }

    /// Check the invariants the session relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantum_length == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        let capacities = [
            ("control_queue_capacity", self.control_queue_capacity),
            ("render_queue_capacity", self.render_queue_capacity),
            ("graph_queue_capacity", self.graph_queue_capacity),
            ("capture_queue_quanta", self.capture_queue_quanta),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity(name));
            }
        }
        Ok(())
    }

    /// Capacity of a capture ring in samples
    pub fn capture_capacity(&self) -> usize {
        self.quantum_length * self.capture_queue_quanta
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms.max(1))
    }

    /// Whether `label` is one of the preferred microphone labels (exact match)
    pub fn is_preferred_microphone(&self, label: &str) -> bool {
        self.microphone_labels.iter().any(|l| l == label)
    }
}
