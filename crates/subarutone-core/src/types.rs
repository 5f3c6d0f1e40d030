//! Common types for Subarutone
//!
//! This module contains the fundamental types shared by the control and
//! render contexts: the sample type, the quantum length and the input mode.

use std::fmt;
use std::str::FromStr;

/// Default quantum length in frames (one render callback worth of audio)
///
/// 128 frames @ 44.1kHz = ~2.9ms per quantum.
pub const QUANTUM_LENGTH: usize = 128;

/// Voice id of the Subaru voice bundled with the engine
pub const SUBARU_VOICE_ID: u32 = 0;

/// Audio sample type (32-bit float, same layout as the engine's linear memory)
pub type Sample = f32;

/// Input mode of a session
///
/// `Unset` is the initial state of a fresh session and is never re-entered
/// once a switch has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// No mode selected yet
    #[default]
    Unset,
    /// Tone generation from a slider-selected target frequency
    Slider,
    /// Live microphone-to-voice conversion
    Otamatone,
}

impl Mode {
    /// Get the wire name of this mode
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Unset => "unset",
            Mode::Slider => "slider",
            Mode::Otamatone => "otamatone",
        }
    }

    /// Whether this mode can be requested by a switch
    #[inline]
    pub fn is_selectable(&self) -> bool {
        !matches!(self, Mode::Unset)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized mode value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid mode request: {0}")]
pub struct InvalidModeRequest(pub String);

impl FromStr for Mode {
    type Err = InvalidModeRequest;

    /// Parse a selectable mode. `"unset"` is not a valid request.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slider" => Ok(Mode::Slider),
            "otamatone" => Ok(Mode::Otamatone),
            other => Err(InvalidModeRequest(other.to_string())),
        }
    }
}
