//! Controller error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::device::DeviceError;
use crate::engine::InitFailure;
use crate::graph::GraphError;
use crate::types::Mode;

/// Errors of mode switches and control-rate operations
///
/// A failed switch leaves the previous mode fully in place.
#[derive(Error, Debug)]
pub enum ModeError {
    #[error("Synthesis engine is not ready")]
    EngineNotReady,

    #[error("Operation requires slider mode (current mode: {0})")]
    NotInSliderMode(Mode),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(f32),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Render command queue is full")]
    ChannelFull,

    #[error("Session has been torn down")]
    TornDown,
}

/// Errors of session initialization
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Init(#[from] InitFailure),

    #[error("Synthesis engine did not become ready within {0:?}")]
    ReadyTimeout(std::time::Duration),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Render command queue is full")]
    ChannelFull,

    #[error("Session is already initialized")]
    AlreadyInitialized,

    #[error("Session has been torn down")]
    TornDown,
}

/// Result type for mode operations
pub type ModeResult<T> = Result<T, ModeError>;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
