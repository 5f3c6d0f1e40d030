//! Render-side error payloads
//!
//! Render-context failures never cross the real-time boundary as panics or
//! returned errors; they are wrapped in [`RenderError`] and sent to the
//! control context as `RenderMessage::Error`.

use thiserror::Error;

use crate::engine::{InitFailure, QuantumError};
use crate::types::InvalidModeRequest;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Engine initialization failed (fatal to the session)
    #[error(transparent)]
    Init(#[from] InitFailure),

    /// One quantum failed; processing continues with the next one
    #[error("Quantum processing failed ({consecutive} in a row): {error}")]
    Quantum {
        error: QuantumError,
        consecutive: u32,
    },

    /// A mode message carried a value that cannot be switched to
    #[error(transparent)]
    InvalidMode(#[from] InvalidModeRequest),
}

impl RenderError {
    /// Whether this error ends the session's chance of becoming ready
    ///
    /// A rejected duplicate initialize leaves the running engine untouched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::Init(failure)
                if !matches!(failure, InitFailure::AlreadyInitialized | InitFailure::Released)
        )
    }
}
