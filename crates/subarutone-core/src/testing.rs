//! Test doubles shared by the unit tests
//!
//! - `MockEngine` / `MockLoader`: a synthesis engine with observable calls
//! - `StubDeviceHost` / `StubStream`: a scripted device list
//! - `ManualGraph` / `GraphMonitor`: drives the render host from a plain thread
//! - `SequenceClock`: orders events recorded by different doubles

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::bridge::RenderHost;
use crate::device::{
    DeviceError, DeviceHost, DeviceInfo, DeviceKind, DeviceResult, InputStream, StreamConstraints,
};
use crate::engine::{
    BufferAddress, EngineDiagnostics, EngineFault, EngineLoader, InitFailure, InitResult,
    SynthesisEngine,
};
use crate::graph::{AudioGraph, CaptureFeed, GraphError, GraphResult, SourceKind};
use crate::types::Sample;

/// Frequency the mock reports for captured audio
pub const CAPTURED_FREQUENCY: f32 = 261.6;

/// Sample value the mock writes for a generated tone
pub const TONE_LEVEL: Sample = 0.1;

/// Samples of linear memory owned by the mock
const MOCK_MEMORY_LEN: usize = 1024;

/// Byte address of the mock's single allocation
const MOCK_BUFFER_ADDRESS: usize = 64;

/// How long the `wait_for_*` helpers poll before giving up
const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Shared sequence numbers for ordering events across test doubles
///
/// Ticks start at 1; 0 means "never happened".
#[derive(Clone, Default)]
pub struct SequenceClock(Arc<AtomicU64>);

impl SequenceClock {
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct CounterState {
    init_calls: AtomicUsize,
    allocated_bytes: AtomicUsize,
    free_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
    /// Sequence numbers of the last free/destroy (0 = never)
    clock: SequenceClock,
    freed_at: AtomicU64,
    destroyed_at: AtomicU64,
    /// (sample rate, quantum length, voice) of the last handshake
    init_params: Mutex<Option<(u32, usize, u32)>>,
    /// Easy-mode flag of the last per-quantum call
    last_easy_mode: Mutex<Option<bool>>,
    /// Name of the thread the last mock was dropped on
    dropped_on: Mutex<Option<String>>,
}

/// Call counters of every mock created from it
#[derive(Clone, Default)]
pub struct EngineCounters(Arc<CounterState>);

impl EngineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_calls(&self) -> usize {
        self.0.init_calls.load(Ordering::SeqCst)
    }

    pub fn allocated_bytes(&self) -> usize {
        self.0.allocated_bytes.load(Ordering::SeqCst)
    }

    pub fn free_calls(&self) -> usize {
        self.0.free_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.0.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn freed_before_destroy(&self) -> bool {
        let freed = self.0.freed_at.load(Ordering::SeqCst);
        let destroyed = self.0.destroyed_at.load(Ordering::SeqCst);
        freed != 0 && destroyed != 0 && freed < destroyed
    }

    pub fn init_params(&self) -> Option<(u32, usize, u32)> {
        *self.0.init_params.lock().unwrap()
    }

    pub fn last_easy_mode(&self) -> Option<bool> {
        *self.0.last_easy_mode.lock().unwrap()
    }

    /// Wait for a mock to be dropped and return its thread's name
    pub fn wait_for_drop(&self) -> Option<String> {
        let deadline = Instant::now() + WAIT_LIMIT;
        while Instant::now() < deadline {
            if let Some(name) = self.0.dropped_on.lock().unwrap().clone() {
                return Some(name);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    fn tick(&self) -> u64 {
        self.0.clock.tick()
    }

    fn record_easy_mode(&self, easy_mode: bool) {
        *self.0.last_easy_mode.lock().unwrap() = Some(easy_mode);
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MockBehavior {
    reject_init: bool,
    fail_allocation: bool,
    fault_capture: bool,
    fail_load: bool,
}

/// Engine that halves captured audio and echoes the target frequency
pub struct MockEngine {
    counters: EngineCounters,
    behavior: MockBehavior,
    memory: Vec<Sample>,
}

impl MockEngine {
    pub fn new(counters: &EngineCounters) -> Self {
        Self {
            counters: counters.clone(),
            behavior: MockBehavior::default(),
            memory: vec![0.0; MOCK_MEMORY_LEN],
        }
    }

    pub fn rejecting_init(mut self) -> Self {
        self.behavior.reject_init = true;
        self
    }

    pub fn failing_allocation(mut self) -> Self {
        self.behavior.fail_allocation = true;
        self
    }

    fn region(&mut self, buffer: BufferAddress) -> &mut [Sample] {
        let offset = buffer.0 / std::mem::size_of::<Sample>();
        let len = self.counters.allocated_bytes() / std::mem::size_of::<Sample>();
        &mut self.memory[offset..offset + len]
    }
}

impl SynthesisEngine for MockEngine {
    fn initialize(&mut self, sample_rate: u32, quantum_length: usize, voice_id: u32) -> bool {
        self.counters.0.init_calls.fetch_add(1, Ordering::SeqCst);
        *self.counters.0.init_params.lock().unwrap() = Some((sample_rate, quantum_length, voice_id));
        !self.behavior.reject_init
    }

    fn allocate_buffer(&mut self, byte_length: usize) -> Option<BufferAddress> {
        if self.behavior.fail_allocation {
            return None;
        }
        self.counters
            .0
            .allocated_bytes
            .store(byte_length, Ordering::SeqCst);
        Some(BufferAddress(MOCK_BUFFER_ADDRESS))
    }

    fn free_buffer(&mut self, _address: BufferAddress) {
        self.counters.0.free_calls.fetch_add(1, Ordering::SeqCst);
        let at = self.counters.tick();
        self.counters.0.freed_at.store(at, Ordering::SeqCst);
    }

    fn memory(&self) -> &[Sample] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [Sample] {
        &mut self.memory
    }

    fn process_captured_audio(&mut self, buffer: BufferAddress, easy_mode: bool) -> Result<f32, EngineFault> {
        self.counters.record_easy_mode(easy_mode);
        if self.behavior.fault_capture {
            return Err(EngineFault::new("mock capture fault"));
        }
        for sample in self.region(buffer) {
            *sample *= 0.5;
        }
        Ok(CAPTURED_FREQUENCY)
    }

    fn generate_tone(&mut self, buffer: BufferAddress, target_hz: f32, easy_mode: bool) -> Result<f32, EngineFault> {
        self.counters.record_easy_mode(easy_mode);
        self.region(buffer).fill(TONE_LEVEL);
        Ok(target_hz)
    }

    fn destroy(&mut self) {
        self.counters.0.destroy_calls.fetch_add(1, Ordering::SeqCst);
        let at = self.counters.tick();
        self.counters.0.destroyed_at.store(at, Ordering::SeqCst);
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        let name = thread::current().name().unwrap_or("<unnamed>").to_string();
        *self.counters.0.dropped_on.lock().unwrap() = Some(name);
    }
}

/// Loader producing `MockEngine`s
pub struct MockLoader {
    counters: EngineCounters,
    behavior: MockBehavior,
}

impl MockLoader {
    pub fn new(counters: &EngineCounters) -> Self {
        Self {
            counters: counters.clone(),
            behavior: MockBehavior::default(),
        }
    }

    pub fn rejecting_init(mut self) -> Self {
        self.behavior.reject_init = true;
        self
    }

    pub fn faulting_capture(mut self) -> Self {
        self.behavior.fault_capture = true;
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.behavior.fail_load = true;
        self
    }
}

impl EngineLoader for MockLoader {
    fn load(&mut self, _binary: &[u8], _diagnostics: EngineDiagnostics) -> InitResult<Box<dyn SynthesisEngine>> {
        if self.behavior.fail_load {
            return Err(InitFailure::Load("mock binary is invalid".to_string()));
        }
        let mut engine = MockEngine::new(&self.counters);
        engine.behavior = self.behavior;
        Ok(Box::new(engine))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Devices
// ═══════════════════════════════════════════════════════════════════════════

struct OpenedStream {
    device_id: String,
    label: String,
    stop_calls: Arc<AtomicUsize>,
    stopped_at: Arc<AtomicU64>,
}

/// Snapshot of one stream opened by a `StubDeviceHost`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub device_id: String,
    pub label: String,
    pub stop_calls: usize,
    /// Clock tick of the first `stop` (0 = never stopped)
    pub stopped_at: u64,
}

/// Observes a `StubDeviceHost` after it has been moved
#[derive(Clone, Default)]
pub struct StubMonitor {
    streams: Arc<Mutex<Vec<OpenedStream>>>,
    constraints: Arc<Mutex<Vec<StreamConstraints>>>,
    clock: SequenceClock,
}

impl StubMonitor {
    /// Every stream opened so far, in order
    pub fn streams(&self) -> Vec<StreamRecord> {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .map(|s| StreamRecord {
                device_id: s.device_id.clone(),
                label: s.label.clone(),
                stop_calls: s.stop_calls.load(Ordering::SeqCst),
                stopped_at: s.stopped_at.load(Ordering::SeqCst),
            })
            .collect()
    }

    /// Streams opened and never stopped
    pub fn active_streams(&self) -> usize {
        self.streams().iter().filter(|s| s.stop_calls == 0).count()
    }

    pub fn last_constraints(&self) -> Option<StreamConstraints> {
        self.constraints.lock().unwrap().last().cloned()
    }
}

/// Device host with a fixed device list; the first input is the default
pub struct StubDeviceHost {
    devices: Vec<DeviceInfo>,
    deny_permission: bool,
    fail_pinned_open: bool,
    monitor: StubMonitor,
}

impl StubDeviceHost {
    pub fn with_inputs(labels: &[&str]) -> Self {
        Self {
            devices: labels
                .iter()
                .enumerate()
                .map(|(i, label)| DeviceInfo::audio_input(format!("mic-{}", i), *label))
                .collect(),
            deny_permission: false,
            fail_pinned_open: false,
            monitor: StubMonitor::default(),
        }
    }

    pub fn with_output(mut self, label: &str) -> Self {
        self.devices.push(DeviceInfo {
            id: format!("out-{}", self.devices.len()),
            label: label.to_string(),
            kind: DeviceKind::AudioOutput,
        });
        self
    }

    pub fn denying_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn failing_pinned_open(mut self) -> Self {
        self.fail_pinned_open = true;
        self
    }

    /// Stamp stream stops with ticks of a shared clock
    pub fn with_clock(mut self, clock: &SequenceClock) -> Self {
        self.monitor.clock = clock.clone();
        self
    }

    pub fn monitor(&self) -> StubMonitor {
        self.monitor.clone()
    }

    fn inputs(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.iter().filter(|d| d.is_audio_input())
    }
}

impl DeviceHost for StubDeviceHost {
    type Stream = StubStream;

    async fn enumerate_devices(&self) -> DeviceResult<Vec<DeviceInfo>> {
        Ok(self.devices.clone())
    }

    async fn open_input(&self, constraints: &StreamConstraints) -> DeviceResult<StubStream> {
        self.monitor.constraints.lock().unwrap().push(constraints.clone());
        if self.deny_permission {
            return Err(DeviceError::PermissionDenied("denied by stub".to_string()));
        }
        let device = match &constraints.device_id {
            None => self.inputs().next().ok_or(DeviceError::NotFound)?,
            Some(_) if self.fail_pinned_open => {
                return Err(DeviceError::AcquisitionFailed("stub refused pinned open".to_string()))
            }
            Some(id) => self
                .inputs()
                .find(|d| &d.id == id)
                .ok_or_else(|| DeviceError::AcquisitionFailed(format!("no device {}", id)))?,
        };

        let stop_calls = Arc::new(AtomicUsize::new(0));
        let stopped_at = Arc::new(AtomicU64::new(0));
        self.monitor.streams.lock().unwrap().push(OpenedStream {
            device_id: device.id.clone(),
            label: device.label.clone(),
            stop_calls: Arc::clone(&stop_calls),
            stopped_at: Arc::clone(&stopped_at),
        });
        let (feeder, capture) = rtrb::RingBuffer::new(1024);
        Ok(StubStream {
            device_id: device.id.clone(),
            capture: Some(capture),
            _feeder: feeder,
            stop_calls,
            stopped_at,
            clock: self.monitor.clock.clone(),
        })
    }
}

/// Stream handed out by `StubDeviceHost`; counts `stop` calls
pub struct StubStream {
    device_id: String,
    capture: Option<CaptureFeed>,
    _feeder: rtrb::Producer<Sample>,
    stop_calls: Arc<AtomicUsize>,
    stopped_at: Arc<AtomicU64>,
    clock: SequenceClock,
}

impl InputStream for StubStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn take_capture(&mut self) -> Option<CaptureFeed> {
        self.capture.take()
    }

    fn stop(&mut self) {
        if self.stop_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.stopped_at.store(self.clock.tick(), Ordering::SeqCst);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Graph
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct ManualState {
    host: Option<RenderHost>,
    closed: bool,
    /// Driver keeps running but renders nothing
    suspended: bool,
    /// Source changes seen by the render host, stamped with clock ticks
    sources: Vec<(u64, Option<SourceKind>)>,
}

/// Observes and steers a `ManualGraph` after it has been moved
#[derive(Clone)]
pub struct GraphMonitor {
    state: Arc<Mutex<ManualState>>,
}

impl GraphMonitor {
    /// Stop rendering; returns once no quantum is in flight
    pub fn suspend(&self) {
        self.state.lock().unwrap().suspended = true;
    }

    pub fn resume(&self) {
        self.state.lock().unwrap().suspended = false;
    }

    /// Wait until the render host has `kind` attached; returns the tick
    pub fn wait_for_source(&self, kind: SourceKind) -> Option<u64> {
        let deadline = Instant::now() + WAIT_LIMIT;
        while Instant::now() < deadline {
            let found = self
                .state
                .lock()
                .unwrap()
                .sources
                .iter()
                .find(|(_, source)| *source == Some(kind))
                .map(|(at, _)| *at);
            if found.is_some() {
                return found;
            }
            thread::sleep(Duration::from_millis(2));
        }
        None
    }
}

/// Audio graph driven by a plain thread, one quantum per millisecond
pub struct ManualGraph {
    sample_rate: u32,
    channels: usize,
    running: bool,
    clock: SequenceClock,
    state: Arc<Mutex<ManualState>>,
    driver: Option<JoinHandle<()>>,
}

impl ManualGraph {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            running: true,
            clock: SequenceClock::default(),
            state: Arc::default(),
            driver: None,
        }
    }

    /// Never render any quantum (a suspended clock)
    pub fn paused(mut self) -> Self {
        self.running = false;
        self
    }

    /// Stamp source changes with ticks of a shared clock
    pub fn with_clock(mut self, clock: &SequenceClock) -> Self {
        self.clock = clock.clone();
        self
    }

    pub fn monitor(&self) -> GraphMonitor {
        GraphMonitor {
            state: Arc::clone(&self.state),
        }
    }
}

impl AudioGraph for ManualGraph {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, mut host: RenderHost) -> GraphResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(GraphError::Closed);
        }
        if state.host.is_some() {
            return Err(GraphError::AlreadyStarted);
        }
        host.prepare(self.channels);
        state.host = Some(host);
        drop(state);

        if self.running {
            let state = Arc::clone(&self.state);
            let clock = self.clock.clone();
            self.driver = Some(thread::spawn(move || {
                let mut last_source = None;
                loop {
                    {
                        let mut state = state.lock().unwrap();
                        if state.closed {
                            break;
                        }
                        if !state.suspended {
                            let source = state.host.as_mut().map(|host| {
                                host.render_quantum();
                                host.source_kind()
                            });
                            if let Some(source) = source {
                                if source != last_source {
                                    last_source = source;
                                    state.sources.push((clock.tick(), source));
                                }
                            }
                        }
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }));
        }
        Ok(())
    }

    fn close(&mut self) {
        let host = {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.host.take()
        };
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
        drop(host);
    }
}

impl Drop for ManualGraph {
    fn drop(&mut self) {
        self.close();
    }
}
