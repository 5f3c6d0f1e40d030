//! Session lifecycle and the mode state machine
//!
//! ```text
//!           switch_to_slider / user_touch
//!   Unset ─────────────────────────────────► Slider ◄──┐
//!     │                                        │       │ switch_to_slider
//!     │ switch_to_otamatone                    ▼       │
//!     └──────────────────────────────────► Otamatone ──┘
//! ```
//!
//! Every switch is all-or-nothing: queue capacity is checked and the
//! microphone is acquired before the graph or the render side is touched,
//! so a failure leaves the previous mode, source and stream in place.
//! All operations take `&mut self`, which serializes them per session.

use std::sync::Arc;

use basedrop::Owned;
use crossbeam::channel::Sender;
use tokio::time::Instant;

use crate::bridge::{
    control_channel, render_channel, ControlMessage, ControlSender, FrequencyParam, RenderBridge,
    RenderError, RenderHost, RenderMessage, RenderReceiver,
};
use crate::config::SessionConfig;
use crate::device::{select_microphone, DeviceError, DeviceHost, InputStream, MicrophoneSelection};
use crate::engine::{EngineLoader, InitFailure};
use crate::gc::gc_handle;
use crate::graph::{graph_channel, AudioGraph, DummySource, GraphPort, SourceFeed, SourceKind};
use crate::pitch::slider_to_frequency;
use crate::types::Mode;

use super::error::{ModeError, ModeResult, SessionError, SessionResult};
use super::{ModeSwitch, SessionEvent};

/// Control-side ends of the render link, created by `initialize_session`
struct RenderLink {
    commands: ControlSender,
    messages: RenderReceiver,
    port: GraphPort,
    frequency: FrequencyParam,
}

/// Control-thread owner of one voice session
pub struct ModeController<H: DeviceHost, G: AudioGraph> {
    config: Arc<SessionConfig>,
    host: H,
    graph: G,
    events: Sender<SessionEvent>,
    link: Option<RenderLink>,
    /// Active microphone stream (otamatone mode only)
    microphone: Option<H::Stream>,
    mode: Mode,
    easy_mode: bool,
    engine_ready: bool,
    init_failure: Option<InitFailure>,
    torn_down: bool,
}

impl<H: DeviceHost, G: AudioGraph> ModeController<H, G> {
    /// Create a controller; events are forwarded to `events`
    pub fn new(
        config: SessionConfig,
        host: H,
        graph: G,
        events: Sender<SessionEvent>,
    ) -> SessionResult<Self> {
        config.validate()?;
        // Spawn the collector here so the render thread never has to
        let _ = gc_handle();

        Ok(Self {
            config: Arc::new(config),
            host,
            graph,
            events,
            link: None,
            microphone: None,
            mode: Mode::Unset,
            easy_mode: false,
            engine_ready: false,
            init_failure: None,
            torn_down: false,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn easy_mode(&self) -> bool {
        self.easy_mode
    }

    pub fn is_ready(&self) -> bool {
        self.engine_ready
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Upstream source as last configured by the controller
    pub fn attached_source(&self) -> Option<SourceKind> {
        self.link.as_ref().and_then(|link| link.port.attached())
    }

    /// Render messages dropped because the channel was full
    pub fn dropped_messages(&self) -> u64 {
        self.link.as_ref().map_or(0, |link| link.messages.dropped())
    }

    /// Start the render side and wait for the engine to become ready
    ///
    /// Sends `initialize` with the graph's sample rate and the configured
    /// voice, then forwards render messages until `ready` arrives,
    /// initialization fails, or the ready timeout expires.
    pub async fn initialize_session(
        &mut self,
        loader: Box<dyn EngineLoader>,
        engine_binary: Vec<u8>,
    ) -> SessionResult<()> {
        if self.torn_down {
            return Err(SessionError::TornDown);
        }
        if self.link.is_some() {
            return Err(SessionError::AlreadyInitialized);
        }

        let config = &self.config;
        let (mut commands, inbox) = control_channel(config.control_queue_capacity);
        let (outbox, messages) = render_channel(config.render_queue_capacity);
        let (port, graph_rx) = graph_channel(config.graph_queue_capacity);
        let frequency = FrequencyParam::default();
        let sample_rate = self.graph.sample_rate();
        let voice_id = config.voice_id;

        log::info!(
            "Initializing session (sample rate {}Hz, quantum {}, voice {}, engine {} bytes)",
            sample_rate,
            config.quantum_length,
            voice_id,
            engine_binary.len()
        );

        // Queued before the graph starts, so it is the first thing the bridge sees
        commands
            .send(ControlMessage::Initialize {
                engine_binary: Owned::new(&gc_handle(), engine_binary),
                sample_rate,
                voice_id,
            })
            .map_err(|_| SessionError::ChannelFull)?;

        let bridge = RenderBridge::new(config, loader, inbox, outbox);
        let render_host = RenderHost::new(bridge, graph_rx, frequency.clone());
        self.graph.start(render_host)?;

        self.link = Some(RenderLink {
            commands,
            messages,
            port,
            frequency,
        });

        let timeout = self.config.ready_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if let Some(failure) = self.init_failure.clone() {
                return Err(SessionError::Init(failure));
            }
            if self.engine_ready {
                return Ok(());
            }
            if Instant::now() >= deadline {
                log::warn!("Synthesis engine not ready after {:?}", timeout);
                return Err(SessionError::ReadyTimeout(timeout));
            }
            tokio::time::sleep(self.config.event_poll_interval()).await;
        }
    }

    /// Forward pending render messages to the event consumer (non-blocking)
    ///
    /// Returns the number of messages forwarded.
    pub fn pump(&mut self) -> usize {
        let mut forwarded = 0;
        while let Some(message) = self.link.as_ref().and_then(|link| link.messages.try_recv()) {
            self.forward(message);
            forwarded += 1;
        }
        forwarded
    }

    /// Switch to tone generation from the slider frequency
    pub fn switch_to_slider(&mut self) -> ModeResult<ModeSwitch> {
        self.pump();
        self.ensure_ready()?;
        if self.mode == Mode::Slider {
            return Ok(ModeSwitch::Unchanged);
        }
        let link = self.link.as_mut().ok_or(ModeError::EngineNotReady)?;
        if !has_switch_capacity(link) {
            return Err(ModeError::ChannelFull);
        }

        if link.port.attached().is_some() {
            link.port.detach()?;
        }
        if let Some(mut stream) = self.microphone.take() {
            stream.stop();
            log::debug!("Microphone stream released");
        }
        link.port.attach(SourceFeed::Dummy(DummySource::silent()))?;
        link.commands
            .send(ControlMessage::Mode(Mode::Slider))
            .map_err(|_| ModeError::ChannelFull)?;

        let previous = std::mem::replace(&mut self.mode, Mode::Slider);
        log::info!("Switched to slider mode (was {})", previous);
        Ok(ModeSwitch::Switched)
    }

    /// Switch to live microphone-to-voice conversion
    ///
    /// On failure the previous mode is kept; there is no fallback to slider.
    pub async fn switch_to_otamatone(&mut self) -> ModeResult<ModeSwitch> {
        self.pump();
        self.ensure_ready()?;
        if self.mode == Mode::Otamatone {
            return Ok(ModeSwitch::Unchanged);
        }
        match self.link.as_ref() {
            Some(link) if has_switch_capacity(link) => {}
            Some(_) => return Err(ModeError::ChannelFull),
            None => return Err(ModeError::EngineNotReady),
        }

        let selection = match select_microphone(&self.host, &self.config).await {
            Ok(selection) => selection,
            Err(e) => {
                log::warn!("Microphone selection failed: {}", e);
                self.emit(SessionEvent::Log {
                    text: format!("Could not connect the microphone: {}", e),
                    user_visible: true,
                });
                return Err(e.into());
            }
        };
        self.emit(SessionEvent::Log {
            text: selection.report(),
            user_visible: true,
        });

        self.connect_microphone(selection)
    }

    /// Set the engine's easy mode; independent of the current mode
    pub fn toggle_easy_mode(&mut self, enabled: bool) -> ModeResult<()> {
        if self.torn_down {
            return Err(ModeError::TornDown);
        }
        let link = self.link.as_mut().ok_or(ModeError::EngineNotReady)?;
        link.commands
            .send(ControlMessage::EasyMode(enabled))
            .map_err(|_| ModeError::ChannelFull)?;
        self.easy_mode = enabled;
        log::info!("Easy mode {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Set the slider target; picked up at the start of the next quantum
    pub fn set_frequency(&self, hz: f32) -> ModeResult<()> {
        self.ensure_ready()?;
        if self.mode != Mode::Slider {
            return Err(ModeError::NotInSliderMode(self.mode));
        }
        if !hz.is_finite() {
            return Err(ModeError::InvalidFrequency(hz));
        }
        let link = self.link.as_ref().ok_or(ModeError::EngineNotReady)?;
        link.frequency.set(hz.max(0.0));
        Ok(())
    }

    /// Set the slider target from a position in `0.0..=1.0`
    ///
    /// Returns the frequency that was set.
    pub fn set_slider_position(&self, position: f32) -> ModeResult<f32> {
        let hz = slider_to_frequency(position.clamp(0.0, 1.0));
        self.set_frequency(hz)?;
        Ok(hz)
    }

    /// Finger lifted from the slider: silence the tone
    pub fn release_slider(&self) -> ModeResult<()> {
        self.set_frequency(0.0)
    }

    /// First user interaction: enter slider mode if no mode is set yet
    pub fn user_touch(&mut self) -> ModeResult<ModeSwitch> {
        self.pump();
        if self.mode == Mode::Unset && self.engine_ready && !self.torn_down {
            self.switch_to_slider()
        } else {
            Ok(ModeSwitch::Unchanged)
        }
    }

    /// Release every resource and tear the engine down
    ///
    /// Runs once; later calls are no-ops. Also runs on drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(link) = self.link.as_mut() {
            if link.port.attached().is_some() && link.port.detach().is_err() {
                log::warn!("Graph queue full during teardown; source is released with the graph");
            }
        }
        if let Some(mut stream) = self.microphone.take() {
            stream.stop();
        }
        if let Some(link) = self.link.as_mut() {
            if link.commands.send(ControlMessage::Destruct).is_err() {
                log::warn!("Control queue full during teardown; engine is released with the graph");
            }
        }

        // Dropping the render host releases the engine if `destruct` was not processed
        self.graph.close();
        self.pump();
        self.engine_ready = false;
        log::info!("Session torn down");
    }

    fn ensure_ready(&self) -> ModeResult<()> {
        if self.torn_down {
            Err(ModeError::TornDown)
        } else if !self.engine_ready {
            Err(ModeError::EngineNotReady)
        } else {
            Ok(())
        }
    }

    fn connect_microphone(&mut self, selection: MicrophoneSelection<H::Stream>) -> ModeResult<ModeSwitch> {
        let MicrophoneSelection {
            stream: mut microphone,
            selected,
            ..
        } = selection;

        let Some(capture) = microphone.take_capture() else {
            microphone.stop();
            return Err(DeviceError::AcquisitionFailed(format!(
                "'{}' has no capture feed",
                selected.label
            ))
            .into());
        };
        let Some(link) = self.link.as_mut() else {
            microphone.stop();
            return Err(ModeError::EngineNotReady);
        };

        // Capacity was checked before selection and nothing else pushes
        let attached = link
            .port
            .detach()
            .and_then(|()| link.port.attach(SourceFeed::Capture(capture)));
        if let Err(e) = attached {
            microphone.stop();
            restore_source(&mut link.port, self.mode);
            return Err(e.into());
        }
        if link.commands.send(ControlMessage::Mode(Mode::Otamatone)).is_err() {
            microphone.stop();
            restore_source(&mut link.port, self.mode);
            return Err(ModeError::ChannelFull);
        }

        self.microphone = Some(microphone);
        let previous = std::mem::replace(&mut self.mode, Mode::Otamatone);
        log::info!(
            "Switched to otamatone mode using '{}' (was {})",
            selected.label,
            previous
        );
        Ok(ModeSwitch::Switched)
    }

    fn forward(&mut self, message: RenderMessage) {
        let event = match message {
            RenderMessage::Ready => {
                self.engine_ready = true;
                log::info!("Synthesis engine ready");
                SessionEvent::Ready
            }
            RenderMessage::Frequency { hz } => SessionEvent::Frequency(hz),
            RenderMessage::Log(text) => {
                log::debug!("[render] {}", text);
                SessionEvent::Log {
                    text,
                    user_visible: false,
                }
            }
            RenderMessage::Error(error) => {
                if let RenderError::Init(failure) = &error {
                    if error.is_fatal() {
                        log::error!("Synthesis engine failed to initialize: {}", failure);
                        self.init_failure = Some(failure.clone());
                    } else {
                        log::warn!("{}", failure);
                    }
                } else {
                    log::warn!("Render error: {}", error);
                }
                SessionEvent::Error(error.to_string())
            }
        };
        self.emit(event);
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.try_send(event).is_err() {
            log::trace!("Session event dropped (consumer gone or full)");
        }
    }
}

impl<H: DeviceHost, G: AudioGraph> Drop for ModeController<H, G> {
    fn drop(&mut self) {
        if !self.torn_down {
            log::debug!("Controller dropped without teardown, tearing down now");
            self.teardown();
        }
    }
}

/// Room for detach + attach and the mode message
fn has_switch_capacity(link: &RenderLink) -> bool {
    link.commands.has_space() && link.port.free_slots() >= 2
}

/// Put back the source `mode` runs on after a failed switch
fn restore_source(port: &mut GraphPort, mode: Mode) {
    let restored = match mode {
        Mode::Slider => port.attach(SourceFeed::Dummy(DummySource::silent())),
        _ => port.detach(),
    };
    if let Err(e) = restored {
        log::warn!("Could not restore the {} source: {}", mode, e);
    }
}
