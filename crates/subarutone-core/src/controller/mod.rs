//! Mode controller - the control-thread side of a voice session
//!
//! Owns the audio graph, the microphone resource and the current mode, and
//! talks to the render bridge only through messages and the frequency
//! parameter. Render-side messages are forwarded to the view layer as
//! [`SessionEvent`]s by [`ModeController::pump`].

mod error;
mod session;

pub use error::{ModeError, ModeResult, SessionError, SessionResult};
pub use session::ModeController;

/// Events forwarded to the external consumer (view layer)
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Engine initialized; mode switches are possible
    Ready,
    /// Frequency of the last quantum, whole Hz
    Frequency(u32),
    /// Diagnostic text; `user_visible` marks text meant for the user's log
    Log { text: String, user_visible: bool },
    /// Render-side failure
    Error(String),
}

/// Outcome of a mode switch that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitch {
    /// The mode changed
    Switched,
    /// Already in the requested mode (or nothing to do); no message sent
    Unchanged,
}
