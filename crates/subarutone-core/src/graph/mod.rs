//! Signal graph plumbing
//!
//! The graph is deliberately small: one upstream source feeding the render
//! bridge, whose output goes to the hardware. The controller changes the
//! source by pushing [`GraphCommand`]s through its [`GraphPort`]; the render
//! host applies them at the start of the next quantum.
//!
//! ```text
//!  DummySource ─┐
//!               ├─► RenderHost ─► RenderBridge ─► output device
//!  Capture ring ┘   (one source at a time)
//! ```

use basedrop::Owned;
use thiserror::Error;

use crate::audio::AudioError;
use crate::bridge::RenderHost;
use crate::gc::gc_handle;
use crate::types::Sample;

/// Captured samples of a microphone (channel 0), filled by the input stream
pub type CaptureFeed = rtrb::Consumer<Sample>;

/// Silent/constant signal source used in slider mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DummySource {
    pub level: Sample,
}

impl DummySource {
    pub fn silent() -> Self {
        Self { level: 0.0 }
    }
}

/// Upstream source of the render bridge
pub enum SourceFeed {
    Dummy(DummySource),
    Capture(CaptureFeed),
}

impl SourceFeed {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceFeed::Dummy(_) => SourceKind::Dummy,
            SourceFeed::Capture(_) => SourceKind::Microphone,
        }
    }
}

/// What is currently attached upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Dummy,
    Microphone,
}

/// Source changes applied by the render host
///
/// Feeds are wrapped in `Owned` so a replaced or detached feed is freed on
/// the GC thread, not the audio thread.
pub enum GraphCommand {
    /// Replace the upstream source
    Attach(Owned<SourceFeed>),
    /// Remove the upstream source
    Detach,
}

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph command queue is full")]
    QueueFull,

    #[error("Audio graph is already running")]
    AlreadyStarted,

    #[error("Audio graph is closed")]
    Closed,

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Create the controller -> render host command queue
pub fn graph_channel(capacity: usize) -> (GraphPort, rtrb::Consumer<GraphCommand>) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    (
        GraphPort {
            producer,
            attached: None,
        },
        consumer,
    )
}

/// Controller-side handle for changing the upstream source
pub struct GraphPort {
    producer: rtrb::Producer<GraphCommand>,
    /// What the render host will have after applying queued commands
    attached: Option<SourceKind>,
}

impl GraphPort {
    /// Queue `feed` as the new upstream source
    pub fn attach(&mut self, feed: SourceFeed) -> GraphResult<()> {
        let kind = feed.kind();
        self.push(GraphCommand::Attach(Owned::new(&gc_handle(), feed)))?;
        self.attached = Some(kind);
        Ok(())
    }

    /// Queue removal of the upstream source
    pub fn detach(&mut self) -> GraphResult<()> {
        self.push(GraphCommand::Detach)?;
        self.attached = None;
        Ok(())
    }

    pub fn attached(&self) -> Option<SourceKind> {
        self.attached
    }

    /// Number of commands that can be queued without failing
    pub fn free_slots(&self) -> usize {
        self.producer.slots()
    }

    fn push(&mut self, command: GraphCommand) -> GraphResult<()> {
        self.producer
            .push(command)
            .map_err(|_| GraphError::QueueFull)
    }
}

/// Output side of a session: runs the render host on the audio clock
///
/// Implementations are not required to be `Send`; cpal streams are not.
pub trait AudioGraph {
    /// Sample rate the render host will be driven at
    fn sample_rate(&self) -> u32;

    /// Take ownership of the render host and start driving quanta
    fn start(&mut self, host: RenderHost) -> GraphResult<()>;

    /// Stop driving quanta and drop the render host
    fn close(&mut self);
}
