//! RT-safe garbage collection for render-side resources
//!
//! This module provides a global `basedrop` collector that defers the
//! deallocation of values that end their life on the render thread: the
//! engine instance, the engine binary carried by the `initialize` message,
//! and capture rings detached from the graph.
//!
//! With `basedrop::Owned<T>`:
//! - Drop on the render thread: just enqueues a pointer
//! - Actual deallocation: happens on the GC thread where latency doesn't matter
//!
//! ## Usage
//!
//! ```ignore
//! use basedrop::Owned;
//! use crate::gc::gc_handle;
//!
//! let binary = Owned::new(&gc_handle(), engine_bytes);
//! // moved to the render thread, dropped there, freed here
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Global handle for creating Owned<T> allocations
///
/// The actual Collector lives on a dedicated GC thread.
static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Collection period of the GC thread
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

/// Initialize the global collector and return a handle
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("subarutone-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it is created on the thread that owns it
            let mut collector = Collector::new();

            tx.send(collector.handle()).expect("Failed to send GC handle");

            log::info!("Render GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn render GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Get a handle for creating Owned<T> allocations
///
/// The first call spawns the collector thread, so call this once from the
/// control thread before the render thread can need it.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
