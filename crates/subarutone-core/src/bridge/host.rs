//! Render host - adapts the hardware callback to fixed quanta
//!
//! Hardware callbacks come in whatever size the backend negotiated. The host
//! slices them into exact `quantum_length` frames for the render bridge,
//! keeping one rendered quantum pending across callbacks. All buffers are
//! allocated up front in [`RenderHost::prepare`].

use basedrop::Owned;

use crate::graph::{GraphCommand, SourceFeed, SourceKind};
use crate::types::Sample;

use super::params::FrequencyParam;
use super::render::RenderBridge;

/// Everything the audio callback owns
pub struct RenderHost {
    bridge: RenderBridge,
    graph_rx: rtrb::Consumer<GraphCommand>,
    source: Option<Owned<SourceFeed>>,
    frequency: FrequencyParam,
    quantum_length: usize,
    /// Pre-allocated captured quantum (channel 0)
    input: Vec<Sample>,
    /// Last rendered quantum, interleaved
    pending: Vec<Sample>,
    channels: usize,
    /// Frames of `pending` already handed to the hardware
    cursor: usize,
    keep_alive: bool,
}

impl RenderHost {
    pub fn new(
        bridge: RenderBridge,
        graph_rx: rtrb::Consumer<GraphCommand>,
        frequency: FrequencyParam,
    ) -> Self {
        let quantum_length = bridge.quantum_length();
        Self {
            bridge,
            graph_rx,
            source: None,
            frequency,
            quantum_length,
            input: vec![0.0; quantum_length],
            pending: Vec::new(),
            channels: 0,
            cursor: quantum_length,
            keep_alive: true,
        }
    }

    /// Allocate the pending buffer for `channels` output channels
    ///
    /// Call before the stream starts; allocates.
    pub fn prepare(&mut self, channels: usize) {
        let channels = channels.max(1);
        self.channels = channels;
        self.pending = vec![0.0; self.quantum_length * channels];
        self.cursor = self.quantum_length;
    }

    /// Fill an interleaved hardware buffer of any length
    pub fn render(&mut self, data: &mut [Sample], channels: usize) {
        if channels != self.channels {
            // Only reached when the backend changed its channel count
            self.prepare(channels);
        }
        let channels = self.channels;
        let frames = data.len() / channels;

        let mut written = 0;
        while written < frames {
            if self.cursor == self.quantum_length {
                self.render_quantum();
            }
            let n = (self.quantum_length - self.cursor).min(frames - written);
            let src = &self.pending[self.cursor * channels..(self.cursor + n) * channels];
            data[written * channels..(written + n) * channels].copy_from_slice(src);
            self.cursor += n;
            written += n;
        }
        data[frames * channels..].fill(0.0);
    }

    /// Render one quantum into the pending buffer
    ///
    /// Returns the bridge's keep-alive flag.
    pub fn render_quantum(&mut self) -> bool {
        if self.channels == 0 {
            self.prepare(1);
        }
        self.apply_graph_commands();
        let has_input = self.pull_input();

        let input = if has_input { Some(&self.input[..]) } else { None };
        self.keep_alive =
            self.bridge
                .process(input, &mut self.pending, self.channels, self.frequency.get());
        self.cursor = 0;
        self.keep_alive
    }

    /// The most recently rendered quantum, interleaved
    pub fn pending_quantum(&self) -> &[Sample] {
        &self.pending
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn bridge(&self) -> &RenderBridge {
        &self.bridge
    }

    /// Kind of the source currently feeding the bridge
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source.as_ref().map(|feed| feed.kind())
    }

    fn apply_graph_commands(&mut self) {
        while let Ok(command) = self.graph_rx.pop() {
            // Replaced feeds drop here and are reclaimed by the GC thread
            self.source = match command {
                GraphCommand::Attach(feed) => Some(feed),
                GraphCommand::Detach => None,
            };
        }
    }

    /// Fill `input` from the attached source; false if no quantum is available
    fn pull_input(&mut self) -> bool {
        let q = self.quantum_length;
        match self.source.as_deref_mut() {
            None => false,
            Some(SourceFeed::Dummy(dummy)) => {
                self.input.fill(dummy.level);
                true
            }
            Some(SourceFeed::Capture(capture)) => {
                if capture.slots() < q {
                    return false;
                }
                let Ok(chunk) = capture.read_chunk(q) else {
                    return false;
                };
                let (first, second) = chunk.as_slices();
                self.input[..first.len()].copy_from_slice(first);
                self.input[first.len()..].copy_from_slice(second);
                chunk.commit_all();
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{control_channel, render_channel, ControlMessage, RenderMessage};
    use crate::config::SessionConfig;
    use crate::gc::gc_handle;
    use crate::graph::{graph_channel, DummySource};
    use crate::testing::{EngineCounters, MockLoader, CAPTURED_FREQUENCY, TONE_LEVEL};
    use crate::types::Mode;

    const Q: usize = 128;

    fn host() -> (
        RenderHost,
        crate::bridge::ControlSender,
        crate::bridge::RenderReceiver,
        crate::graph::GraphPort,
        FrequencyParam,
    ) {
        let counters = EngineCounters::new();
        let (mut commands, inbox) = control_channel(16);
        let (outbox, messages) = render_channel(1024);
        let (port, graph_rx) = graph_channel(8);
        let frequency = FrequencyParam::default();
        let bridge = RenderBridge::new(
            &SessionConfig::default(),
            Box::new(MockLoader::new(&counters)),
            inbox,
            outbox,
        );
        commands
            .send(ControlMessage::Initialize {
                engine_binary: Owned::new(&gc_handle(), Vec::new()),
                sample_rate: 44100,
                voice_id: 0,
            })
            .unwrap();
        let mut host = RenderHost::new(bridge, graph_rx, frequency.clone());
        host.prepare(2);
        (host, commands, messages, port, frequency)
    }

    fn frequencies(messages: &crate::bridge::RenderReceiver) -> Vec<u32> {
        std::iter::from_fn(|| messages.try_recv())
            .filter_map(|m| match m {
                RenderMessage::Frequency { hz } => Some(hz),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_odd_callback_sizes_render_whole_quanta() {
        let (mut host, mut commands, messages, _port, frequency) = host();
        commands.send(ControlMessage::Mode(Mode::Slider)).unwrap();
        frequency.set(440.0);

        // 3 callbacks of 100 frames = 300 frames -> 3 quanta started
        let mut data = vec![0.0f32; 200];
        for _ in 0..3 {
            host.render(&mut data, 2);
            assert!(data.iter().all(|&s| s == TONE_LEVEL));
        }

        assert_eq!(frequencies(&messages), vec![440, 440, 440]);
    }

    #[test]
    fn test_frequency_change_applies_at_next_quantum() {
        let (mut host, mut commands, messages, _port, frequency) = host();
        commands.send(ControlMessage::Mode(Mode::Slider)).unwrap();
        frequency.set(220.0);

        let mut data = vec![0.0f32; 64 * 2];
        host.render(&mut data, 2);
        frequency.set(330.0);
        // Remaining 64 frames of the first quantum, then one new quantum
        host.render(&mut data, 2);
        host.render(&mut data, 2);

        assert_eq!(frequencies(&messages), vec![220, 330]);
    }

    #[test]
    fn test_capture_feed_needs_a_full_quantum() {
        let (mut host, mut commands, messages, mut port, _frequency) = host();
        commands.send(ControlMessage::Mode(Mode::Otamatone)).unwrap();

        let (mut producer, capture) = rtrb::RingBuffer::new(Q * 4);
        port.attach(SourceFeed::Capture(capture)).unwrap();

        for _ in 0..Q / 2 {
            producer.push(0.5).unwrap();
        }
        host.render_quantum();
        assert!(frequencies(&messages).is_empty());
        assert!(host.pending_quantum().iter().all(|&s| s == 0.0));

        for _ in 0..Q {
            producer.push(0.5).unwrap();
        }
        host.render_quantum();
        assert_eq!(
            frequencies(&messages),
            vec![CAPTURED_FREQUENCY.round() as u32]
        );
        assert!(host.pending_quantum().iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_detach_removes_input() {
        let (mut host, mut commands, messages, mut port, _frequency) = host();
        commands.send(ControlMessage::Mode(Mode::Otamatone)).unwrap();
        port.attach(SourceFeed::Dummy(DummySource { level: 0.5 })).unwrap();

        host.render_quantum();
        assert_eq!(frequencies(&messages).len(), 1);
        assert_eq!(host.source_kind(), Some(SourceKind::Dummy));

        port.detach().unwrap();
        host.render_quantum();
        assert!(frequencies(&messages).is_empty());
        assert_eq!(host.source_kind(), None);
    }

    #[test]
    fn test_keep_alive_drops_after_destruct() {
        let (mut host, mut commands, _messages, _port, _frequency) = host();
        assert!(host.render_quantum());

        commands.send(ControlMessage::Destruct).unwrap();
        assert!(!host.render_quantum());
        assert!(!host.keep_alive());
        assert!(host.bridge().is_released());
    }
}
