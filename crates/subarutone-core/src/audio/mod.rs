//! Hardware audio backend for Subarutone (cpal)
//!
//! - **Output**: [`CpalGraph`] runs the render host in the output stream's
//!   callback, one quantum per hardware buffer where the device allows it
//! - **Input**: [`CpalDeviceHost`] enumerates microphones and opens
//!   [`CpalInputStream`]s feeding lock-free capture rings
//!
//! # Example Usage
//!
//! ```ignore
//! use subarutone_core::audio::{CpalDeviceHost, CpalGraph};
//! use subarutone_core::config::SessionConfig;
//! use subarutone_core::controller::ModeController;
//! use subarutone_core::graph::AudioGraph;
//!
//! let config = SessionConfig::default();
//! let graph = CpalGraph::open(&config.audio, config.quantum_length)?;
//! let host = CpalDeviceHost::new(graph.sample_rate(), config.capture_capacity());
//! let (events_tx, events_rx) = crossbeam::channel::unbounded();
//! let mut controller = ModeController::new(config, host, graph, events_tx)?;
//! controller.initialize_session(loader, engine_binary).await?;
//! ```

mod capture;
mod config;
mod cpal_backend;
mod device;
mod error;

pub use capture::{CpalDeviceHost, CpalInputStream};
pub use config::{AudioConfig, DeviceId};
pub use cpal_backend::CpalGraph;
pub use device::{
    default_input_device, default_output_device, find_input_device, find_output_device,
    input_device_names,
};
pub use error::{AudioError, AudioResult};
