//! Session configuration for Subarutone
//!
//! - Generic YAML config loading/saving
//! - Default config location
//! - The immutable [`SessionConfig`] shared by every component of a session
//!
//! # Usage
//!
//! ```ignore
//! use subarutone_core::config::{default_config_path, load_config, SessionConfig};
//!
//! let config: SessionConfig = load_config(&default_config_path());
//! config.validate()?;
//! ```

mod io;
mod paths;
mod session;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};
pub use session::{ConfigError, SessionConfig, DEFAULT_MICROPHONE_LABELS};
