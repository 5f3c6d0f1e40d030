//! Engine handle - lifecycle wrapper around the opaque synthesis engine
//!
//! The synthesis engine is an external component consumed through a narrow
//! operation set ([`SynthesisEngine`]). An [`EngineHandle`] only exists for an
//! engine that completed the initialize handshake and owns a shared buffer;
//! teardown consumes the handle, so processing after teardown cannot be
//! expressed.

use std::mem::size_of;

use basedrop::Owned;

use crate::bridge::RenderSender;
use crate::gc::gc_handle;
use crate::types::Sample;

use super::buffer::{BufferAddress, SharedAudioBuffer};
use super::error::{EngineFault, InitFailure, InitResult, QuantumError, QuantumResult};

/// Operations consumed from the external synthesis engine
///
/// Implementations are called from the render thread only. None of the
/// per-quantum methods may block or allocate.
pub trait SynthesisEngine: Send {
    /// One-time handshake; returns false on failure
    fn initialize(&mut self, sample_rate: u32, quantum_length: usize, voice_id: u32) -> bool;

    /// Allocate `byte_length` bytes of linear memory
    fn allocate_buffer(&mut self, byte_length: usize) -> Option<BufferAddress>;

    /// Release an allocation made by `allocate_buffer`
    fn free_buffer(&mut self, address: BufferAddress);

    /// The engine's linear memory, viewed as samples
    fn memory(&self) -> &[Sample];

    /// The engine's linear memory, viewed as samples (writable)
    fn memory_mut(&mut self) -> &mut [Sample];

    /// Convert the captured quantum at `buffer` into voice, in place.
    /// Returns the estimated fundamental (0 for silence / unvoiced).
    fn process_captured_audio(
        &mut self,
        buffer: BufferAddress,
        easy_mode: bool,
    ) -> Result<f32, EngineFault>;

    /// Synthesize one quantum of voice at `target_hz` into `buffer`.
    /// Returns the effective frequency.
    fn generate_tone(
        &mut self,
        buffer: BufferAddress,
        target_hz: f32,
        easy_mode: bool,
    ) -> Result<f32, EngineFault>;

    /// Destroy the engine instance
    fn destroy(&mut self);
}

/// Turns an engine binary into an engine instance
///
/// Runs on the render thread when the `initialize` message arrives.
pub trait EngineLoader: Send {
    fn load(
        &mut self,
        binary: &[u8],
        diagnostics: EngineDiagnostics,
    ) -> InitResult<Box<dyn SynthesisEngine>>;
}

/// Diagnostics sink handed to the engine
///
/// Forwards engine-originated text to the control context as log messages.
/// Best-effort: a full channel drops the message.
#[derive(Clone)]
pub struct EngineDiagnostics {
    sender: RenderSender,
    forward_debug: bool,
}

impl EngineDiagnostics {
    pub fn new(sender: RenderSender, forward_debug: bool) -> Self {
        Self {
            sender,
            forward_debug,
        }
    }

    pub fn log(&self, text: &str) {
        self.sender.log(format!("[ENGINE] {}", text));
    }

    pub fn debug(&self, text: &str) {
        if self.forward_debug {
            self.sender.log(format!("[DEBUG] [ENGINE] {}", text));
        }
    }
}

/// Parameters of the initialize handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    pub sample_rate: u32,
    pub quantum_length: usize,
    pub voice_id: u32,
}

/// An initialized engine together with its shared buffer
pub struct EngineHandle {
    /// Wrapped in `Owned` so the instance is freed on the GC thread
    engine: Owned<Box<dyn SynthesisEngine>>,
    buffer: SharedAudioBuffer,
}

impl EngineHandle {
    /// Run the initialize handshake and allocate the shared buffer
    ///
    /// On any failure the engine is destroyed before returning, so a failed
    /// initialize leaks nothing. The instance itself is always freed on the
    /// GC thread, never on the caller's.
    pub fn initialize(
        engine: Box<dyn SynthesisEngine>,
        params: EngineParams,
    ) -> InitResult<Self> {
        let mut engine = Owned::new(&gc_handle(), engine);
        if !engine.initialize(params.sample_rate, params.quantum_length, params.voice_id) {
            engine.destroy();
            return Err(InitFailure::Rejected {
                sample_rate: params.sample_rate,
                quantum_length: params.quantum_length,
                voice_id: params.voice_id,
            });
        }

        let byte_length = params.quantum_length * size_of::<Sample>();
        let Some(address) = engine.allocate_buffer(byte_length) else {
            engine.destroy();
            return Err(InitFailure::BufferAllocation { byte_length });
        };

        let memory_len = engine.memory().len();
        let buffer = match SharedAudioBuffer::new(address, params.quantum_length, memory_len) {
            Ok(buffer) => buffer,
            Err(e) => {
                engine.free_buffer(address);
                engine.destroy();
                return Err(e.into());
            }
        };

        Ok(Self { engine, buffer })
    }

    /// The shared buffer's region
    pub fn buffer(&self) -> &SharedAudioBuffer {
        &self.buffer
    }

    /// Copy a captured quantum into the shared buffer and run the
    /// microphone-to-voice transform. Returns the estimated frequency.
    pub fn process_captured_audio(&mut self, input: &[Sample], easy_mode: bool) -> QuantumResult<f32> {
        if input.len() != self.buffer.len() {
            return Err(QuantumError::LengthMismatch {
                expected: self.buffer.len(),
                actual: input.len(),
            });
        }
        self.buffer
            .view_mut(self.engine.memory_mut())?
            .copy_from_slice(input);

        let hz = self
            .engine
            .process_captured_audio(self.buffer.address(), easy_mode)?;
        checked_frequency(hz)
    }

    /// Synthesize one quantum at `target_hz`. Returns the effective frequency.
    pub fn generate_tone(&mut self, target_hz: f32, easy_mode: bool) -> QuantumResult<f32> {
        let hz = self
            .engine
            .generate_tone(self.buffer.address(), target_hz, easy_mode)?;
        checked_frequency(hz)
    }

    /// The engine's output quantum (mono)
    pub fn output(&self) -> QuantumResult<&[Sample]> {
        Ok(self.buffer.view(self.engine.memory())?)
    }

    /// Free the shared buffer, then destroy the engine
    pub fn teardown(mut self) {
        let address = self.buffer.address();
        self.engine.free_buffer(address);
        self.engine.destroy();
        // `self.engine` drops here; the allocation is reclaimed by the GC thread
    }
}

#[inline]
fn checked_frequency(hz: f32) -> QuantumResult<f32> {
    if hz.is_finite() {
        Ok(hz)
    } else {
        Err(QuantumError::NonFiniteFrequency(hz))
    }
}
