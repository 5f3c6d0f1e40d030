//! Render bridge - the real-time side of a voice session
//!
//! - `message`: control <-> render mailboxes
//! - `params`: control-rate values read once per quantum
//! - `render`: per-quantum state machine driving the engine
//! - `host`: adapts hardware callbacks to fixed quanta and applies graph changes

mod error;
mod host;
mod message;
mod params;
mod render;

pub use error::RenderError;
pub use host::RenderHost;
pub use message::{
    control_channel, render_channel, ControlMessage, ControlSender, RenderMessage, RenderReceiver,
    RenderSender,
};
pub use params::FrequencyParam;
pub use render::RenderBridge;
