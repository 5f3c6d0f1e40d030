//! Control-rate parameters read by the render context
//!
//! Written by the control thread, read once per quantum by the render thread,
//! both with relaxed ordering. A new value is picked up at the start of the
//! next quantum (k-rate, no ramping).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Target frequency for slider mode, in Hz
///
/// Stored as `f32` bits in an `AtomicU32`.
#[derive(Debug, Clone)]
pub struct FrequencyParam(Arc<AtomicU32>);

impl FrequencyParam {
    pub fn new(hz: f32) -> Self {
        Self(Arc::new(AtomicU32::new(hz.to_bits())))
    }

    /// Schedule a new value for the next quantum (lock-free)
    #[inline]
    pub fn set(&self, hz: f32) {
        self.0.store(hz.to_bits(), Ordering::Relaxed);
    }

    /// Current value (lock-free)
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for FrequencyParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
