//! Engine handle error types

use thiserror::Error;

use super::buffer::BufferAddress;

/// Errors of the bounds-checked shared buffer view
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Address is not aligned to a sample boundary
    #[error("Buffer address {0} is not aligned to a 4-byte sample boundary")]
    Misaligned(BufferAddress),

    /// Region does not fit inside the engine's linear memory
    #[error("Buffer region {offset}..{end} exceeds engine memory of {memory_len} samples")]
    OutOfBounds {
        offset: usize,
        end: usize,
        memory_len: usize,
    },
}

/// Failure reported by the engine itself during a quantum
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Engine fault: {0}")]
pub struct EngineFault(pub String);

impl EngineFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Engine initialization failures (fatal to the session, never retried)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitFailure {
    /// The engine binary could not be turned into an engine instance
    #[error("Failed to load synthesis engine: {0}")]
    Load(String),

    /// The engine's initialize handshake reported non-success
    #[error("Synthesis engine rejected initialization (sample rate {sample_rate}Hz, quantum {quantum_length}, voice {voice_id})")]
    Rejected {
        sample_rate: u32,
        quantum_length: usize,
        voice_id: u32,
    },

    /// The engine could not allocate the shared buffer
    #[error("Synthesis engine failed to allocate {byte_length} bytes for the shared buffer")]
    BufferAllocation { byte_length: usize },

    /// The allocated buffer is unusable
    #[error("Shared buffer is unusable: {0}")]
    Buffer(#[from] BufferError),

    /// A second initialize arrived while the engine is already running
    #[error("Synthesis engine is already initialized")]
    AlreadyInitialized,

    /// Initialize arrived after the session was torn down
    #[error("Synthesis engine was already released")]
    Released,
}

/// Per-quantum processing errors (caught, reported, processing continues)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantumError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Engine(#[from] EngineFault),

    /// Input quantum does not match the shared buffer length
    #[error("Input quantum has {actual} samples, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Engine returned NaN or infinity as the frequency
    #[error("Engine returned a non-finite frequency: {0}")]
    NonFiniteFrequency(f32),
}

/// Result type for engine initialization
pub type InitResult<T> = Result<T, InitFailure>;

/// Result type for per-quantum engine calls
pub type QuantumResult<T> = Result<T, QuantumError>;
