//! Transport controller
//!
//! Owns the single active output node and the decoded buffer for the
//! current track, and implements play, pause, stop, seek, volume, mute and
//! speed changes as atomic state transitions. A monotonically increasing
//! generation token makes stale async results inert: any cache lookup,
//! synthesis call, or decode that completes after the token has advanced is
//! silently discarded.

use crate::audio::clock::PlaybackClock;
use crate::audio::decode::decode_pcm16;
use crate::audio::output::{AudioOutput, NodeParams, OutputNode};
use crate::audio::AudioBuffer;
use crate::error::{Error, Result};
use crate::playback::pipeline::{self, SYNTHESIS_CHANNELS, SYNTHESIS_SAMPLE_RATE};
use crate::services::{AudioCache, SpeechSynthesizer};
use crate::state::{SharedState, TrackRef};
use planvox_common::config::{AudioConfig, AudioConfigStore, Voice};
use planvox_common::events::{PlaybackStatus, PlayerEvent};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

/// Callback invoked exactly once when a track finishes naturally
///
/// Never invoked on explicit stop or pause; a superseded track's hook is
/// dropped without being called.
pub type EndOfTrackHook = Box<dyn FnOnce() + Send + 'static>;

/// Cadence of the position-polling task while playing
const POSITION_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Delay before an error status auto-clears back to idle
const ERROR_CLEAR_DELAY: Duration = Duration::from_secs(4);

/// Broadcast a progress event every N position polls
const PROGRESS_EVENT_EVERY: u32 = 10;

/// The live node plus the clock anchored to its start
struct ActiveNode {
    node_id: u64,
    node: Box<dyn OutputNode>,
    clock: PlaybackClock,
}

/// Controller-private playback resources
///
/// Exclusively owned: no other component may hold the output node or the
/// decoded buffer once playback has stopped.
struct TransportInner {
    buffer: Option<Arc<AudioBuffer>>,
    active: Option<ActiveNode>,
    resume_offset: f64,
    on_ended: Option<EndOfTrackHook>,
    next_node_id: u64,
}

/// Transport controller for text-to-speech playback
pub struct TransportController {
    state: Arc<SharedState>,
    output: Arc<dyn AudioOutput>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cache: Arc<dyn AudioCache>,
    config_store: AudioConfigStore,
    audio_config: RwLock<AudioConfig>,

    /// Generation token; bumped on every load_and_play
    generation: Arc<AtomicU64>,

    inner: Mutex<TransportInner>,
    running: AtomicBool,
    progress_counter: AtomicU32,
}

impl TransportController {
    /// Create a controller, loading the persisted audio config
    pub async fn new(
        state: Arc<SharedState>,
        output: Arc<dyn AudioOutput>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        cache: Arc<dyn AudioCache>,
        config_store: AudioConfigStore,
    ) -> Arc<Self> {
        let config = config_store.load();
        state.set_speed(config.speed).await;
        info!(
            "Transport controller created (voice={}, speed={})",
            config.voice, config.speed
        );

        Arc::new(Self {
            state,
            output,
            synthesizer,
            cache,
            config_store,
            audio_config: RwLock::new(config),
            generation: Arc::new(AtomicU64::new(0)),
            inner: Mutex::new(TransportInner {
                buffer: None,
                active: None,
                resume_offset: 0.0,
                on_ended: None,
                next_node_id: 1,
            }),
            running: AtomicBool::new(true),
            progress_counter: AtomicU32::new(0),
        })
    }

    /// Shared state handle (for event subscription and UI reads)
    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Currently selected synthesis voice
    pub async fn voice(&self) -> Voice {
        self.audio_config.read().await.voice
    }

    /// Start the background position-polling task
    pub fn spawn_position_task(controller: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(POSITION_POLL_INTERVAL);
            loop {
                tick.tick().await;
                if !controller.running.load(Ordering::SeqCst) {
                    debug!("Position task stopping");
                    break;
                }
                controller.poll_position().await;
            }
        })
    }

    /// Stop background tasks and release playback resources
    pub async fn shutdown(&self) {
        info!("Shutting down transport controller");
        self.running.store(false, Ordering::SeqCst);
        let _ = self.stop(true).await;
    }

    /// Load, generate, and play a new track
    ///
    /// Cancels any in-flight generation by bumping the generation token;
    /// the previous node and decoded buffer are discarded immediately, even
    /// if the old generation's async work is still pending.
    pub async fn load_and_play(
        &self,
        track: TrackRef,
        on_ended: Option<EndOfTrackHook>,
    ) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let text = track.text.clone();

        info!("Load and play: {} (generation {})", track.title, generation);

        // Discard the previous track's resources up front
        {
            let mut inner = self.inner.lock().await;
            if let Some(mut active) = inner.active.take() {
                active.node.stop();
            }
            inner.buffer = None;
            inner.on_ended = None;
            inner.resume_offset = 0.0;
        }

        if text.trim().is_empty() {
            let err = Error::InvalidText("Cannot play empty text".to_string());
            self.enter_error(generation, &err).await;
            return Err(err);
        }

        self.state.set_error_message(None).await;
        self.state.set_current_track(Some(track.clone())).await;
        self.state.set_position(0.0, 0.0).await;
        self.state.set_status(PlaybackStatus::Loading).await;

        let voice = self.audio_config.read().await.voice;

        let bytes = match pipeline::resolve_audio(
            self.cache.as_ref(),
            self.synthesizer.as_ref(),
            voice,
            &text,
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                self.enter_error(generation, &e).await;
                return Err(e);
            }
        };

        let buffer = match decode_pcm16(&bytes, SYNTHESIS_SAMPLE_RATE, SYNTHESIS_CHANNELS) {
            Ok(buffer) => Arc::new(buffer),
            Err(e) => {
                self.enter_error(generation, &e).await;
                return Err(e);
            }
        };

        // Install point: the token is validated under the inner lock, so a
        // newer load (or an explicit stop) that bumped it can never
        // interleave between the check and the install. A superseded result
        // is dropped here without touching playback resources.
        {
            let mut inner = self.inner.lock().await;
            if !self.is_current(generation) {
                debug!("Discarding superseded result (generation {})", generation);
                return Ok(());
            }
            inner.buffer = Some(Arc::clone(&buffer));
            inner.on_ended = on_ended;
            inner.resume_offset = 0.0;
            self.state.set_position(0.0, buffer.duration_secs()).await;
        }

        if let Err(e) = self.start_playback_for(0.0, generation).await {
            self.enter_error(generation, &e).await;
            return Err(e);
        }

        if !self.is_current(generation) {
            return Ok(());
        }

        self.state.broadcast_event(PlayerEvent::TrackStarted {
            chapter_index: track.chapter_index,
            segment_index: track.segment_index,
            title: track.title,
            timestamp: chrono::Utc::now(),
        });

        Ok(())
    }

    /// Toggle between play and pause
    ///
    /// No-op while loading or in error; from idle with a loaded buffer this
    /// resumes from the stored offset.
    pub async fn play_pause(&self) -> Result<()> {
        match self.state.get_status().await {
            PlaybackStatus::Playing => self.pause().await,
            PlaybackStatus::Paused | PlaybackStatus::Idle => {
                let offset = {
                    let inner = self.inner.lock().await;
                    if inner.buffer.is_none() {
                        return Ok(());
                    }
                    inner.resume_offset
                };
                self.start_playback(offset).await
            }
            PlaybackStatus::Loading | PlaybackStatus::Error => Ok(()),
        }
    }

    /// Pause playback, freezing the current position as the resume offset
    pub async fn pause(&self) -> Result<()> {
        if self.state.get_status().await != PlaybackStatus::Playing {
            return Ok(());
        }

        let duration = self.state.get_position().await.duration_secs;
        let position = {
            let mut inner = self.inner.lock().await;
            let position = match inner.active.as_ref() {
                Some(active) => active.clock.position(self.output.clock_now()),
                None => inner.resume_offset,
            };
            let position = position.clamp(0.0, duration);

            if let Some(mut active) = inner.active.take() {
                active.node.stop();
            }
            inner.resume_offset = position;
            position
        };

        self.state.set_position(position, duration).await;
        self.state.set_status(PlaybackStatus::Paused).await;
        info!("Paused at {:.2}s", position);
        Ok(())
    }

    /// Seek to a position, clamped to the buffer duration
    ///
    /// While playing this restarts the node from the new offset so the
    /// playback clock reference stays consistent; while paused it only
    /// updates the stored offset and displayed position.
    pub async fn seek_to(&self, position_secs: f64) -> Result<()> {
        let duration = self.state.get_position().await.duration_secs;
        let target = position_secs.clamp(0.0, duration);

        match self.state.get_status().await {
            PlaybackStatus::Playing => {
                debug!("Seek to {:.2}s (playing)", target);
                self.start_playback(target).await
            }
            _ => {
                debug!("Seek to {:.2}s (stored)", target);
                {
                    let mut inner = self.inner.lock().await;
                    inner.resume_offset = target;
                }
                self.state.set_position(target, duration).await;
                Ok(())
            }
        }
    }

    /// Stop playback
    ///
    /// Bumps the generation token, so an in-flight load is cancelled: its
    /// late result is discarded instead of reviving playback. With
    /// `reset_full` the track reference, decoded buffer, and resume offset
    /// are cleared; otherwise they are kept for an imminent play. The
    /// end-of-track hook is dropped either way: explicit stop never chains.
    pub async fn stop(&self, reset_full: bool) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let had_node = {
            let mut inner = self.inner.lock().await;
            let had_node = if let Some(mut active) = inner.active.take() {
                active.node.stop();
                true
            } else {
                false
            };
            inner.on_ended = None;
            if reset_full {
                inner.buffer = None;
                inner.resume_offset = 0.0;
            }
            had_node
        };

        if had_node {
            if let Some(track) = self.state.get_current_track().await {
                self.state.broadcast_event(PlayerEvent::TrackFinished {
                    chapter_index: track.chapter_index,
                    segment_index: track.segment_index,
                    title: track.title,
                    completed: false,
                    timestamp: chrono::Utc::now(),
                });
            }
        }

        if reset_full {
            self.state.set_current_track(None).await;
            self.state.set_position(0.0, 0.0).await;
        }

        self.state.set_error_message(None).await;
        self.state.set_status(PlaybackStatus::Idle).await;
        info!("Stopped (reset_full={})", reset_full);
        Ok(())
    }

    /// Set master volume, applying the new gain to the live node
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.state.set_volume(volume).await;
        self.apply_gain().await;

        self.state.broadcast_event(PlayerEvent::VolumeChanged {
            volume: self.state.get_volume().await,
            muted: self.state.is_muted().await,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Toggle mute without interrupting playback
    pub async fn toggle_mute(&self) -> Result<()> {
        let muted = !self.state.is_muted().await;
        self.state.set_muted(muted).await;
        self.apply_gain().await;

        self.state.broadcast_event(PlayerEvent::VolumeChanged {
            volume: self.state.get_volume().await,
            muted,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Change playback speed, persisting it and re-anchoring the clock
    ///
    /// The live node's rate is updated in place (no restart); the playback
    /// clock captures the position at the old speed and continues with the
    /// new speed from this instant.
    pub async fn set_speed(&self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::Config(format!("Invalid playback speed: {}", speed)));
        }

        {
            let mut config = self.audio_config.write().await;
            config.speed = speed;
            if let Err(e) = self.config_store.save(&config) {
                warn!("Failed to persist audio config: {}", e);
            }
        }
        self.state.set_speed(speed).await;

        {
            let mut inner = self.inner.lock().await;
            if let Some(active) = inner.active.as_mut() {
                let now = self.output.clock_now();
                active.clock.re_anchor(now, speed);
                active.node.set_rate(speed);
            }
        }

        self.state.broadcast_event(PlayerEvent::SpeedChanged {
            speed,
            timestamp: chrono::Utc::now(),
        });
        info!("Playback speed set to {}", speed);
        Ok(())
    }

    /// Change the synthesis voice, persisting it for future tracks
    pub async fn set_voice(&self, voice: Voice) -> Result<()> {
        let mut config = self.audio_config.write().await;
        config.voice = voice;
        if let Err(e) = self.config_store.save(&config) {
            warn!("Failed to persist audio config: {}", e);
        }
        info!("Voice set to {}", voice);
        Ok(())
    }

    /// One position evaluation
    ///
    /// Re-derives the clock formula (never accumulates), publishes the
    /// position, and detects natural end-of-stream. The background task
    /// calls this every poll interval; tests drive it directly.
    pub async fn poll_position(&self) {
        if self.state.get_status().await != PlaybackStatus::Playing {
            return;
        }

        let now = self.output.clock_now();
        let sample = {
            let inner = self.inner.lock().await;
            let active = match inner.active.as_ref() {
                Some(active) => active,
                None => return,
            };
            let duration = inner
                .buffer
                .as_ref()
                .map(|b| b.duration_secs())
                .unwrap_or(0.0);
            (
                active.node_id,
                active.clock.position(now),
                duration,
                active.node.is_exhausted(),
            )
        };
        let (node_id, position, duration, exhausted) = sample;

        if duration > 0.0 && (position >= duration || exhausted) {
            // Clamp for display, then finish
            self.state.set_position(duration, duration).await;
            self.handle_node_ended(node_id).await;
            return;
        }

        self.state
            .set_position(position.clamp(0.0, duration), duration)
            .await;

        let count = self.progress_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if count % PROGRESS_EVENT_EVERY == 0 {
            self.state.broadcast_event(PlayerEvent::PlaybackProgress {
                position_secs: position.clamp(0.0, duration),
                duration_secs: duration,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Natural end-of-stream for a specific node
    ///
    /// A node from a superseded track may signal completion after teardown;
    /// the signal is ignored unless the node is still the active one and
    /// the status is genuinely playing. Invokes the end-of-track hook
    /// exactly once.
    pub async fn handle_node_ended(&self, node_id: u64) {
        if self.state.get_status().await != PlaybackStatus::Playing {
            debug!("Ignoring ended signal while not playing (node {})", node_id);
            return;
        }

        let hook = {
            let mut inner = self.inner.lock().await;
            match inner.active.as_ref() {
                Some(active) if active.node_id == node_id => {}
                _ => {
                    debug!("Ignoring ended signal from superseded node {}", node_id);
                    return;
                }
            }
            if let Some(mut active) = inner.active.take() {
                active.node.stop();
            }
            inner.resume_offset = 0.0;
            inner.on_ended.take()
        };

        self.state.set_status(PlaybackStatus::Idle).await;

        if let Some(track) = self.state.get_current_track().await {
            info!("Track finished naturally: {}", track.title);
            self.state.broadcast_event(PlayerEvent::TrackFinished {
                chapter_index: track.chapter_index,
                segment_index: track.segment_index,
                title: track.title,
                completed: true,
                timestamp: chrono::Utc::now(),
            });
        }

        if let Some(hook) = hook {
            hook();
        }
    }

    /// (Re)create the output node from the decoded buffer at `offset`
    async fn start_playback(&self, offset_secs: f64) -> Result<()> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.start_playback_for(offset_secs, generation).await
    }

    /// Node start for a specific generation
    ///
    /// Always stops any currently active node first: at most one node
    /// exists at a time. The token is re-validated under the lock; a
    /// request superseded mid-flight never brings up a node or flips the
    /// status to playing.
    async fn start_playback_for(&self, offset_secs: f64, generation: u64) -> Result<()> {
        let speed = self.state.get_speed().await;
        let gain = self.effective_gain().await;

        let mut inner = self.inner.lock().await;
        if !self.is_current(generation) {
            debug!("Skipping node start for superseded generation {}", generation);
            return Ok(());
        }

        let buffer = inner
            .buffer
            .clone()
            .ok_or_else(|| Error::InvalidState("No decoded buffer to play".to_string()))?;

        if let Some(mut active) = inner.active.take() {
            active.node.stop();
        }

        let node_id = inner.next_node_id;
        inner.next_node_id += 1;

        let node = self.output.start_node(
            buffer,
            NodeParams {
                offset_secs,
                speed,
                gain,
            },
        )?;
        let clock = PlaybackClock::anchored(self.output.clock_now(), offset_secs, speed);

        inner.active = Some(ActiveNode {
            node_id,
            node,
            clock,
        });
        inner.resume_offset = offset_secs;

        // Status flips while the lock is still held, so the node and the
        // playing status appear atomically to other tasks.
        self.state.set_status(PlaybackStatus::Playing).await;
        drop(inner);

        debug!("Playback started at {:.2}s (speed {})", offset_secs, speed);
        Ok(())
    }

    /// Gain to apply to the node: volume, or zero while muted
    async fn effective_gain(&self) -> f32 {
        if self.state.is_muted().await {
            0.0
        } else {
            self.state.get_volume().await
        }
    }

    async fn apply_gain(&self) {
        let gain = self.effective_gain().await;
        let inner = self.inner.lock().await;
        if let Some(active) = inner.active.as_ref() {
            active.node.set_gain(gain);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Transition to the error status and schedule the auto-clear
    ///
    /// Guarded by the generation token so a failure from a superseded
    /// request can never clobber a newer track's state, and the delayed
    /// clear can never reset a newer generation.
    async fn enter_error(&self, generation: u64, error: &Error) {
        if !self.is_current(generation) {
            debug!("Suppressing error from stale generation {}: {}", generation, error);
            return;
        }

        warn!("Playback error: {}", error);
        let message = error.to_string();
        self.state.set_error_message(Some(message.clone())).await;
        self.state.set_status(PlaybackStatus::Error).await;
        self.state.broadcast_event(PlayerEvent::PlaybackError {
            message,
            timestamp: chrono::Utc::now(),
        });

        let state = Arc::clone(&self.state);
        let token = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(ERROR_CLEAR_DELAY).await;
            if token.load(Ordering::SeqCst) == generation
                && state.get_status().await == PlaybackStatus::Error
            {
                state.set_error_message(None).await;
                state.set_status(PlaybackStatus::Idle).await;
                debug!("Error status auto-cleared");
            }
        });
    }
}
