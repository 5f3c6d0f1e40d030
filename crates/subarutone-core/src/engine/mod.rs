//! Engine handle - the opaque synthesis engine and its shared buffer
//!
//! - `SynthesisEngine`: the narrow operation set consumed from the engine
//! - `EngineLoader`: turns an engine binary into an engine instance
//! - `EngineHandle`: initialize / per-quantum calls / teardown
//! - `SharedAudioBuffer`: bounds-checked view into the engine's memory

mod buffer;
mod error;
mod handle;

pub use buffer::{BufferAddress, SharedAudioBuffer};
pub use error::{BufferError, EngineFault, InitFailure, InitResult, QuantumError, QuantumResult};
pub use handle::{EngineDiagnostics, EngineHandle, EngineLoader, EngineParams, SynthesisEngine};
