//! Subarutone Core - real-time voice synthesis session
//!
//! Drives an external synthesis engine from either a slider-selected pitch
//! or a live instrument microphone, at audio-hardware rate.

pub mod audio;
pub mod bridge;
pub mod config;
pub mod controller;
pub mod device;
pub mod engine;
pub mod gc;
pub mod graph;
pub mod pitch;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use types::*;
