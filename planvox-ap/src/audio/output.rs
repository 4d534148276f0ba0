//! Audio output using cpal
//!
//! Defines the output-device seam used by the transport controller and the
//! cpal-backed implementation. The device owns a monotonic clock; each
//! started node emits samples from a decoded buffer at an adjustable rate
//! and gain. At most one node is live at a time (enforced by the
//! controller, which always stops the previous node first).

use crate::audio::clock::{DeviceClock, MonotonicClock};
use crate::audio::AudioBuffer;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Parameters for starting an output node
#[derive(Debug, Clone, Copy)]
pub struct NodeParams {
    /// Media offset to begin emitting from, in seconds
    pub offset_secs: f64,

    /// Playback rate multiplier
    pub speed: f64,

    /// Gain to apply (0.0 = silent; mute is gain 0 with volume preserved)
    pub gain: f32,
}

/// Live handle to hardware-bound playback of one buffer
///
/// Dropping or stopping the node releases the underlying stream; a stopped
/// node must never become audible again.
pub trait OutputNode: Send {
    /// Update gain in place without interrupting playback
    fn set_gain(&self, gain: f32);

    /// Update playback rate in place without restarting
    fn set_rate(&self, speed: f64);

    /// True once the node has emitted the final sample of its buffer
    fn is_exhausted(&self) -> bool;

    /// Stop emitting samples and release the stream
    fn stop(&mut self);
}

/// Output device abstraction
///
/// Process-wide resource: created lazily on first play and reused across
/// tracks. The device clock is the time source for the playback clock.
pub trait AudioOutput: Send + Sync {
    /// Current device clock reading in seconds (monotonic)
    fn clock_now(&self) -> f64;

    /// Start a new node emitting `buffer` from `params.offset_secs`
    fn start_node(&self, buffer: Arc<AudioBuffer>, params: NodeParams) -> Result<Box<dyn OutputNode>>;
}

/// cpal-backed audio output
///
/// Each node runs its stream on a dedicated thread because cpal streams are
/// not `Send`; the handle communicates through shared atomics and mutexes.
pub struct CpalOutput {
    device_name: Option<String>,
    clock: MonotonicClock,
}

impl CpalOutput {
    /// Open the output using the default device
    pub fn new() -> Self {
        Self::with_device(None)
    }

    /// Open the output preferring a named device (falls back to default)
    pub fn with_device(device_name: Option<String>) -> Self {
        Self {
            device_name,
            clock: MonotonicClock::new(),
        }
    }

    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn clock_now(&self) -> f64 {
        self.clock.now()
    }

    fn start_node(&self, buffer: Arc<AudioBuffer>, params: NodeParams) -> Result<Box<dyn OutputNode>> {
        let gain = Arc::new(Mutex::new(params.gain.clamp(0.0, 1.0)));
        let rate = Arc::new(Mutex::new(params.speed));
        let exhausted = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));

        let shared = NodeShared {
            gain: Arc::clone(&gain),
            rate: Arc::clone(&rate),
            exhausted: Arc::clone(&exhausted),
            stopped: Arc::clone(&stopped),
        };

        // The stream thread reports build success/failure before the node
        // handle is returned.
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let device_name = self.device_name.clone();
        let offset = params.offset_secs.max(0.0);

        let join = thread::Builder::new()
            .name("planvox-audio-node".to_string())
            .spawn(move || {
                run_stream_thread(device_name, buffer, offset, shared, ready_tx);
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn audio thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(Error::AudioOutput(
                    "Audio thread exited before stream start".to_string(),
                ))
            }
        }

        Ok(Box::new(CpalNode {
            gain,
            rate,
            exhausted,
            stopped,
            _join: join,
        }))
    }
}

/// State shared between the node handle and the stream callback
struct NodeShared {
    gain: Arc<Mutex<f32>>,
    rate: Arc<Mutex<f64>>,
    exhausted: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

struct CpalNode {
    gain: Arc<Mutex<f32>>,
    rate: Arc<Mutex<f64>>,
    exhausted: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    _join: thread::JoinHandle<()>,
}

impl OutputNode for CpalNode {
    fn set_gain(&self, gain: f32) {
        *self.gain.lock().unwrap() = gain.clamp(0.0, 1.0);
    }

    fn set_rate(&self, speed: f64) {
        *self.rate.lock().unwrap() = speed;
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        // The callback observes this flag and emits silence immediately;
        // the stream thread tears the stream down shortly after.
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl Drop for CpalNode {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Open the device, run the stream until stopped or exhausted, then drop it
fn run_stream_thread(
    device_name: Option<String>,
    buffer: Arc<AudioBuffer>,
    offset_secs: f64,
    shared: NodeShared,
    ready_tx: mpsc::Sender<Result<()>>,
) {
    let stopped = Arc::clone(&shared.stopped);
    let exhausted = Arc::clone(&shared.exhausted);

    let stream = match build_stream(device_name, buffer, offset_secs, shared) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(Error::AudioOutput(format!(
            "Failed to start stream: {}",
            e
        ))));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    info!("Audio stream started");

    while !stopped.load(Ordering::SeqCst) && !exhausted.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(20));
    }

    drop(stream);
    debug!("Audio stream released");
}

fn build_stream(
    device_name: Option<String>,
    buffer: Arc<AudioBuffer>,
    offset_secs: f64,
    shared: NodeShared,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();

    let device = match device_name.as_ref() {
        Some(name) => {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;
            match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                Some(dev) => dev,
                None => {
                    warn!("Requested device '{}' not found, using default", name);
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioOutput("No default output device found".to_string())
                    })?
                }
            }
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
    };

    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

    if supported.sample_format() != SampleFormat::F32 {
        return Err(Error::AudioOutput(format!(
            "Unsupported sample format: {:?}",
            supported.sample_format()
        )));
    }

    let config: StreamConfig = supported.config();
    let out_channels = config.channels as usize;
    let out_rate = config.sample_rate.0 as f64;

    debug!(
        "Audio config: sample_rate={}, channels={}",
        config.sample_rate.0, config.channels
    );

    let src_channels = buffer.channels as usize;
    let src_rate = buffer.sample_rate as f64;

    // Read cursor in source frames; advanced by speed * (src_rate/out_rate)
    // per output frame. Nearest-frame lookup is adequate for speech audio.
    let mut cursor = offset_secs * src_rate;
    let total_frames = buffer.frames();

    let gain = shared.gain;
    let rate = shared.rate;
    let exhausted = shared.exhausted;
    let stopped = shared.stopped;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let current_gain = *gain.lock().unwrap();
                let current_rate = *rate.lock().unwrap();
                let step = current_rate * src_rate / out_rate;
                let silent =
                    stopped.load(Ordering::SeqCst) || exhausted.load(Ordering::SeqCst);

                for frame in data.chunks_mut(out_channels) {
                    let src_frame = cursor as usize;
                    if silent || src_frame >= total_frames {
                        for sample in frame.iter_mut() {
                            *sample = 0.0;
                        }
                        if !silent {
                            exhausted.store(true, Ordering::SeqCst);
                        }
                        continue;
                    }

                    let base = src_frame * src_channels;
                    for (ch, sample) in frame.iter_mut().enumerate() {
                        let src_ch = if src_channels == 1 { 0 } else { ch.min(src_channels - 1) };
                        let value = buffer.samples[base + src_ch] * current_gain;
                        *sample = value.clamp(-1.0, 1.0);
                    }

                    cursor += step;
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

    Ok(stream)
}
