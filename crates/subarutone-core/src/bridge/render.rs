//! Render bridge - the per-quantum state machine on the audio thread
//!
//! Owns the engine once it is initialized. Every call to
//! [`RenderBridge::process`] first drains the control inbox, then runs one
//! quantum according to the current mode:
//!
//! ```text
//!   NotReady ──initialize ok──► Ready ──destruct──► Released
//!      │                                               ▲
//!      └──────────────────destruct─────────────────────┘
//! ```
//!
//! Nothing here blocks, locks or logs through the `log` facade. Diagnostics
//! and failures go back to the control context as [`RenderMessage`]s.

use basedrop::Owned;

use crate::config::SessionConfig;
use crate::engine::{
    EngineDiagnostics, EngineHandle, EngineLoader, EngineParams, InitFailure, QuantumResult,
};
use crate::types::{InvalidModeRequest, Mode, Sample};

use super::error::RenderError;
use super::message::{ControlMessage, RenderMessage, RenderSender};

enum BridgeState {
    /// Waiting for a successful `initialize`
    NotReady,
    /// Engine initialized, quanta are processed
    Ready(EngineHandle),
    /// Engine torn down (terminal)
    Released,
}

/// Real-time side of a voice session
pub struct RenderBridge {
    state: BridgeState,
    mode: Mode,
    easy_mode: bool,
    quantum_length: usize,
    forward_engine_debug: bool,
    loader: Box<dyn EngineLoader>,
    inbox: rtrb::Consumer<ControlMessage>,
    outbox: RenderSender,
    /// Quanta failed in a row; reset by the next good quantum
    consecutive_failures: u32,
}

impl RenderBridge {
    pub fn new(
        config: &SessionConfig,
        loader: Box<dyn EngineLoader>,
        inbox: rtrb::Consumer<ControlMessage>,
        outbox: RenderSender,
    ) -> Self {
        Self {
            state: BridgeState::NotReady,
            mode: Mode::Unset,
            easy_mode: false,
            quantum_length: config.quantum_length,
            forward_engine_debug: config.forward_engine_debug,
            loader,
            inbox,
            outbox,
            consecutive_failures: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, BridgeState::Ready(_))
    }

    pub fn is_released(&self) -> bool {
        matches!(self.state, BridgeState::Released)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn easy_mode(&self) -> bool {
        self.easy_mode
    }

    pub fn quantum_length(&self) -> usize {
        self.quantum_length
    }

    /// Run one quantum
    ///
    /// `input` is the captured quantum (channel 0) if an upstream source has
    /// one; `output` holds `quantum_length * channels` interleaved samples.
    /// `control_frequency` is the slider target, constant for the quantum.
    ///
    /// Returns the keep-alive flag: false once the engine has been released.
    pub fn process(
        &mut self,
        input: Option<&[Sample]>,
        output: &mut [Sample],
        channels: usize,
        control_frequency: f32,
    ) -> bool {
        self.drain_inbox();

        let handle = match &mut self.state {
            BridgeState::Ready(handle) => handle,
            BridgeState::NotReady => {
                output.fill(0.0);
                return true;
            }
            BridgeState::Released => {
                output.fill(0.0);
                return false;
            }
        };

        let result = match (self.mode, input) {
            (Mode::Otamatone, Some(input)) => {
                render_captured(handle, input, self.easy_mode, output, channels)
            }
            (Mode::Slider, _) => {
                render_tone(handle, control_frequency, self.easy_mode, output, channels)
            }
            // No mode yet, or no captured quantum available
            _ => {
                output.fill(0.0);
                return true;
            }
        };

        match result {
            Ok(hz) => {
                self.consecutive_failures = 0;
                self.outbox.frequency(hz);
            }
            Err(error) => {
                output.fill(0.0);
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.outbox.error(RenderError::Quantum {
                    error,
                    consecutive: self.consecutive_failures,
                });
            }
        }
        true
    }

    fn drain_inbox(&mut self) {
        while let Ok(message) = self.inbox.pop() {
            self.handle_message(message);
        }
    }

    fn handle_message(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Initialize {
                engine_binary,
                sample_rate,
                voice_id,
            } => self.initialize(engine_binary, sample_rate, voice_id),
            ControlMessage::Mode(mode) => self.set_mode(mode),
            ControlMessage::EasyMode(enabled) => {
                self.easy_mode = enabled;
                self.outbox.log(if enabled {
                    "easy mode enabled"
                } else {
                    "normal mode enabled"
                });
            }
            ControlMessage::Destruct => self.release(),
        }
    }

    fn initialize(&mut self, engine_binary: Owned<Vec<u8>>, sample_rate: u32, voice_id: u32) {
        match self.state {
            BridgeState::NotReady => {}
            BridgeState::Ready(_) => {
                self.outbox.error(InitFailure::AlreadyInitialized);
                return;
            }
            BridgeState::Released => {
                self.outbox.error(InitFailure::Released);
                return;
            }
        }

        self.outbox.log("initializing synthesis engine");
        let diagnostics = EngineDiagnostics::new(self.outbox.clone(), self.forward_engine_debug);
        let params = EngineParams {
            sample_rate,
            quantum_length: self.quantum_length,
            voice_id,
        };
        let result = self
            .loader
            .load(&engine_binary, diagnostics)
            .and_then(|engine| EngineHandle::initialize(engine, params));
        // Freed on the GC thread
        drop(engine_binary);

        match result {
            Ok(handle) => {
                self.state = BridgeState::Ready(handle);
                self.consecutive_failures = 0;
                self.outbox.log("synthesis engine initialized");
                self.outbox.send(RenderMessage::Ready);
            }
            Err(failure) => {
                self.outbox.error(failure);
            }
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        match mode {
            Mode::Slider => self.outbox.log("switched to slider mode"),
            Mode::Otamatone => self.outbox.log("switched to otamatone mode"),
            Mode::Unset => {
                self.outbox.error(InvalidModeRequest(mode.name().to_string()));
                return;
            }
        };
        self.mode = mode;
    }

    fn release(&mut self) {
        if let BridgeState::Ready(handle) = std::mem::replace(&mut self.state, BridgeState::Released) {
            handle.teardown();
        }
    }
}

impl Drop for RenderBridge {
    fn drop(&mut self) {
        // A bridge dropped without `destruct` still frees its engine once
        self.release();
    }
}

fn render_captured(
    handle: &mut EngineHandle,
    input: &[Sample],
    easy_mode: bool,
    output: &mut [Sample],
    channels: usize,
) -> QuantumResult<f32> {
    let hz = handle.process_captured_audio(input, easy_mode)?;
    broadcast(handle.output()?, output, channels);
    Ok(hz)
}

fn render_tone(
    handle: &mut EngineHandle,
    target_hz: f32,
    easy_mode: bool,
    output: &mut [Sample],
    channels: usize,
) -> QuantumResult<f32> {
    let hz = handle.generate_tone(target_hz, easy_mode)?;
    broadcast(handle.output()?, output, channels);
    Ok(hz)
}

/// Copy a mono quantum into every channel of an interleaved buffer
#[inline]
fn broadcast(mono: &[Sample], output: &mut [Sample], channels: usize) {
    let channels = channels.max(1);
    let mut frames = output.chunks_exact_mut(channels);
    for (&sample, frame) in mono.iter().zip(&mut frames) {
        frame.fill(sample);
    }
    for frame in &mut frames {
        frame.fill(0.0);
    }
    frames.into_remainder().fill(0.0);
}
