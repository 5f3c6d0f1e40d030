//! Message channel between the control and render contexts
//!
//! Two one-way mailboxes, each ordered, neither ever blocking:
//!
//! ```text
//! ┌──────────────────┐  ControlMessage (rtrb SPSC)   ┌──────────────────┐
//! │  Mode Controller │──────────────────────────────►│  Render Bridge   │
//! │ (control thread) │◄──────────────────────────────│  (audio thread)  │
//! └──────────────────┘  RenderMessage (crossbeam)    └──────────────────┘
//! ```
//!
//! The control -> render side is a wait-free `rtrb` ring: exactly one
//! producer (the controller) and one consumer (the bridge).
//!
//! The render -> control side is a bounded `crossbeam` channel because it has
//! several producers on the audio thread (the bridge itself and the engine's
//! diagnostics sink). `try_send` never blocks; when the control side falls
//! behind, messages are dropped and counted instead.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use basedrop::Owned;
use crossbeam::channel::{self, Receiver, Sender};

use crate::types::Mode;

use super::error::RenderError;

/// Messages sent from the control context to the render context
pub enum ControlMessage {
    /// Load and initialize the engine
    ///
    /// The binary is wrapped in `Owned` so that dropping it on the audio
    /// thread after loading defers the deallocation to the GC thread.
    Initialize {
        engine_binary: Owned<Vec<u8>>,
        sample_rate: u32,
        voice_id: u32,
    },
    /// Switch the per-quantum behavior
    Mode(Mode),
    /// Toggle the engine's easy mode
    EasyMode(bool),
    /// Tear the engine down (terminal)
    Destruct,
}

impl fmt::Debug for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::Initialize {
                engine_binary,
                sample_rate,
                voice_id,
            } => f
                .debug_struct("Initialize")
                .field("engine_binary_len", &engine_binary.len())
                .field("sample_rate", sample_rate)
                .field("voice_id", voice_id)
                .finish(),
            ControlMessage::Mode(mode) => f.debug_tuple("Mode").field(mode).finish(),
            ControlMessage::EasyMode(flag) => f.debug_tuple("EasyMode").field(flag).finish(),
            ControlMessage::Destruct => f.write_str("Destruct"),
        }
    }
}

/// Messages sent from the render context to the control context
#[derive(Debug, Clone, PartialEq)]
pub enum RenderMessage {
    /// Engine initialized, per-quantum processing is live
    Ready,
    /// Frequency reported for the last quantum, rounded to whole Hz
    Frequency { hz: u32 },
    /// Diagnostic text
    Log(String),
    /// Render-side failure
    Error(RenderError),
}

/// Create the control -> render queue
pub fn control_channel(capacity: usize) -> (ControlSender, rtrb::Consumer<ControlMessage>) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    (ControlSender { producer }, consumer)
}

/// Sending half of the control -> render queue
pub struct ControlSender {
    producer: rtrb::Producer<ControlMessage>,
}

impl ControlSender {
    /// Queue a message for the render context (non-blocking)
    ///
    /// Returns `Err(message)` if the queue is full.
    pub fn send(&mut self, message: ControlMessage) -> Result<(), ControlMessage> {
        self.producer.push(message).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Check if the queue has space for more messages
    pub fn has_space(&self) -> bool {
        self.producer.slots() > 0
    }
}

/// Create the render -> control channel
pub fn render_channel(capacity: usize) -> (RenderSender, RenderReceiver) {
    let (tx, rx) = channel::bounded(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        RenderSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        RenderReceiver { rx, dropped },
    )
}

/// Sending half of the render -> control channel (cloneable, never blocks)
#[derive(Clone)]
pub struct RenderSender {
    tx: Sender<RenderMessage>,
    dropped: Arc<AtomicU64>,
}

impl RenderSender {
    /// Try to deliver a message; returns false if it was dropped
    pub fn send(&self, message: RenderMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Report a frequency, rounded to whole Hz (negative values clamp to 0)
    #[inline]
    pub fn frequency(&self, hz: f32) -> bool {
        self.send(RenderMessage::Frequency {
            hz: hz.round().max(0.0) as u32,
        })
    }

    pub fn log(&self, text: impl Into<String>) -> bool {
        self.send(RenderMessage::Log(text.into()))
    }

    pub fn error(&self, error: impl Into<RenderError>) -> bool {
        self.send(RenderMessage::Error(error.into()))
    }
}

/// Receiving half of the render -> control channel
pub struct RenderReceiver {
    rx: Receiver<RenderMessage>,
    dropped: Arc<AtomicU64>,
}

impl RenderReceiver {
    /// Pop the next message, if any (non-blocking)
    pub fn try_recv(&self) -> Option<RenderMessage> {
        self.rx.try_recv().ok()
    }

    /// Number of messages dropped because the channel was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
