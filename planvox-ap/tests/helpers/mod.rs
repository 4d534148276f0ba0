//! Shared test doubles for the playback integration suites
//!
//! Provides a manually advanced device clock, an instrumented audio output
//! that counts node creation/teardown, and controllable synthesis/cache
//! fakes so token and chaining semantics can be driven deterministically.
#![allow(dead_code)]

use async_trait::async_trait;
use planvox_ap::audio::{AudioBuffer, AudioOutput, NodeParams, OutputNode};
use planvox_ap::error::{Error, Result};
use planvox_ap::services::{AudioCache, SpeechSynthesizer, Summarizer};
use planvox_ap::state::{SharedState, TrackRef};
use planvox_ap::TransportController;
use planvox_common::config::{AudioConfigStore, Voice};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Device clock advanced explicitly by the test
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(0.0)),
        }
    }

    pub fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock().unwrap() += secs;
    }
}

/// Probe into the most recently started mock node
#[derive(Clone)]
pub struct NodeProbe {
    pub gain: Arc<Mutex<f32>>,
    pub rate: Arc<Mutex<f64>>,
    pub exhausted: Arc<AtomicBool>,
}

/// Audio output double with node accounting
pub struct MockOutput {
    pub clock: ManualClock,
    created: AtomicUsize,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    last_node: Mutex<Option<NodeProbe>>,
    last_params: Mutex<Option<NodeParams>>,
}

impl MockOutput {
    pub fn new(clock: ManualClock) -> Arc<Self> {
        Arc::new(Self {
            clock,
            created: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
            last_node: Mutex::new(None),
            last_params: Mutex::new(None),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live nodes observed
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn last_node(&self) -> Option<NodeProbe> {
        self.last_node.lock().unwrap().clone()
    }

    pub fn last_params(&self) -> Option<NodeParams> {
        *self.last_params.lock().unwrap()
    }
}

impl AudioOutput for MockOutput {
    fn clock_now(&self) -> f64 {
        self.clock.now()
    }

    fn start_node(
        &self,
        _buffer: Arc<AudioBuffer>,
        params: NodeParams,
    ) -> Result<Box<dyn OutputNode>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        let probe = NodeProbe {
            gain: Arc::new(Mutex::new(params.gain)),
            rate: Arc::new(Mutex::new(params.speed)),
            exhausted: Arc::new(AtomicBool::new(false)),
        };
        *self.last_node.lock().unwrap() = Some(probe.clone());
        *self.last_params.lock().unwrap() = Some(params);

        Ok(Box::new(MockNode {
            probe,
            live: Arc::clone(&self.live),
            stopped: AtomicBool::new(false),
        }))
    }
}

pub struct MockNode {
    probe: NodeProbe,
    live: Arc<AtomicUsize>,
    stopped: AtomicBool,
}

impl MockNode {
    fn release(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl OutputNode for MockNode {
    fn set_gain(&self, gain: f32) {
        *self.probe.gain.lock().unwrap() = gain;
    }

    fn set_rate(&self, speed: f64) {
        *self.probe.rate.lock().unwrap() = speed;
    }

    fn is_exhausted(&self) -> bool {
        self.probe.exhausted.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.release();
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.release();
    }
}

/// Raw PCM16LE bytes for `frames` mono frames (24 kHz: frames = seconds * 24000)
pub fn pcm_bytes(frames: usize) -> Vec<u8> {
    std::iter::repeat(1000_i16.to_le_bytes())
        .take(frames)
        .flatten()
        .collect()
}

/// Synthesis double
///
/// Returns `frames` of PCM per call. When gated, each call blocks until
/// `release(text)` is invoked, so completions can be resolved out of order.
/// Texts listed in `fail_texts` produce a synthesis error instead.
pub struct MockSynth {
    frames: usize,
    gated: bool,
    calls: AtomicUsize,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    fail_texts: Mutex<HashSet<String>>,
}

impl MockSynth {
    pub fn new(frames: usize) -> Arc<Self> {
        Arc::new(Self {
            frames,
            gated: false,
            calls: AtomicUsize::new(0),
            gates: Mutex::new(HashMap::new()),
            fail_texts: Mutex::new(HashSet::new()),
        })
    }

    pub fn gated(frames: usize) -> Arc<Self> {
        Arc::new(Self {
            frames,
            gated: true,
            calls: AtomicUsize::new(0),
            gates: Mutex::new(HashMap::new()),
            fail_texts: Mutex::new(HashSet::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_for(&self, text: &str) {
        self.fail_texts.lock().unwrap().insert(text.to_string());
    }

    /// Unblock the in-flight (or future) call for `text`
    pub fn release(&self, text: &str) {
        self.gate(text).notify_one();
    }

    fn gate(&self, text: &str) -> Arc<Notify> {
        Arc::clone(
            self.gates
                .lock()
                .unwrap()
                .entry(text.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynth {
    async fn synthesize(&self, text: &str, _voice: Voice) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.gated {
            let gate = self.gate(text);
            gate.notified().await;
        }

        if self.fail_texts.lock().unwrap().contains(text) {
            return Err(Error::Synthesis(format!("mock failure for '{}'", text)));
        }

        Ok(pcm_bytes(self.frames))
    }
}

/// In-memory audio cache
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.entries.lock().unwrap().insert(key.to_string(), bytes);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl AudioCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Summary double that prefixes the chapter title
pub struct MockSummarizer {
    calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, title: &str, content: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("summary of {}: {} chars", title, content.len()))
    }
}

/// Cache whose operations always fail
pub struct FailingCache;

#[async_trait]
impl AudioCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(Error::Cache("mock cache read failure".to_string()))
    }

    async fn put(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
        Err(Error::Cache("mock cache write failure".to_string()))
    }
}

/// Everything a transport test needs, kept alive together
pub struct TestRig {
    pub controller: Arc<TransportController>,
    pub state: Arc<SharedState>,
    pub output: Arc<MockOutput>,
    pub clock: ManualClock,
    pub synth: Arc<MockSynth>,
    pub cache: Arc<MemoryCache>,
    _config_dir: tempfile::TempDir,
}

/// Build a controller wired to mocks (1 second of audio per synthesis)
pub async fn test_rig(synth: Arc<MockSynth>) -> TestRig {
    let clock = ManualClock::new();
    let output = MockOutput::new(clock.clone());
    let cache = MemoryCache::new();
    let state = Arc::new(SharedState::new());
    let config_dir = tempfile::tempdir().unwrap();
    let config_store = AudioConfigStore::new(config_dir.path().join("audio.json"));

    let controller = TransportController::new(
        Arc::clone(&state),
        output.clone() as Arc<dyn AudioOutput>,
        synth.clone() as Arc<dyn SpeechSynthesizer>,
        cache.clone() as Arc<dyn AudioCache>,
        config_store,
    )
    .await;

    TestRig {
        controller,
        state,
        output,
        clock,
        synth,
        cache,
        _config_dir: config_dir,
    }
}

/// Track reference for free-standing text
pub fn track(title: &str, text: &str) -> TrackRef {
    TrackRef {
        chapter_index: None,
        segment_index: None,
        title: title.to_string(),
        text: text.to_string(),
    }
}
