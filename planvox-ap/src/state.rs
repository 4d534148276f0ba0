//! Shared playback state
//!
//! Thread-safe shared state for playback coordination between the transport
//! controller, the position-polling task, and any UI layer. All reads of
//! "current" state go through this single holder, updated synchronously on
//! every transition, so callbacks never act on a stale captured snapshot.

use planvox_common::events::{PlaybackStatus, PlayerEvent};
use tokio::sync::{broadcast, RwLock};

/// Sentinel segment index meaning "whole chapter / summary" rather than a
/// numbered paragraph.
pub const WHOLE_CHAPTER: i32 = -1;

/// Identifies what is currently loaded or playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    /// Chapter index within the document (None for free-standing text)
    pub chapter_index: Option<usize>,

    /// Paragraph index within the chapter; `Some(WHOLE_CHAPTER)` means the
    /// whole chapter or its summary
    pub segment_index: Option<i32>,

    /// Human-readable label shown to the user
    pub title: String,

    /// The exact text that was (or will be) synthesized; doubles as the
    /// cache key component
    pub text: String,
}

/// Current position snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub position_secs: f64,
    pub duration_secs: f64,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    /// Current playback status
    status: RwLock<PlaybackStatus>,

    /// Currently loaded track (None when idle with no buffer)
    current_track: RwLock<Option<TrackRef>>,

    /// Current position and duration in seconds
    position: RwLock<Position>,

    /// Master volume (0.0-1.0)
    volume: RwLock<f32>,

    /// Mute flag (volume is preserved while muted)
    muted: RwLock<bool>,

    /// Playback rate multiplier (persisted across tracks)
    speed: RwLock<f64>,

    /// Error message, present only while status is Error
    error_message: RwLock<Option<String>>,

    /// Event broadcaster for UI listeners and chaining policies
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            status: RwLock::new(PlaybackStatus::Idle),
            current_track: RwLock::new(None),
            position: RwLock::new(Position::default()),
            volume: RwLock::new(1.0),
            muted: RwLock::new(false),
            speed: RwLock::new(1.0),
            error_message: RwLock::new(None),
            event_tx,
        }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: PlayerEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    pub async fn get_status(&self) -> PlaybackStatus {
        *self.status.read().await
    }

    /// Set playback status and broadcast the transition
    pub async fn set_status(&self, status: PlaybackStatus) {
        *self.status.write().await = status;
        self.broadcast_event(PlayerEvent::PlaybackStateChanged {
            status,
            timestamp: chrono::Utc::now(),
        });
    }

    pub async fn get_current_track(&self) -> Option<TrackRef> {
        self.current_track.read().await.clone()
    }

    pub async fn set_current_track(&self, track: Option<TrackRef>) {
        *self.current_track.write().await = track;
    }

    pub async fn get_position(&self) -> Position {
        *self.position.read().await
    }

    pub async fn set_position(&self, position_secs: f64, duration_secs: f64) {
        *self.position.write().await = Position {
            position_secs,
            duration_secs,
        };
    }

    pub async fn get_volume(&self) -> f32 {
        *self.volume.read().await
    }

    /// Set master volume, clamped to 0.0-1.0
    pub async fn set_volume(&self, volume: f32) {
        *self.volume.write().await = volume.clamp(0.0, 1.0);
    }

    pub async fn is_muted(&self) -> bool {
        *self.muted.read().await
    }

    pub async fn set_muted(&self, muted: bool) {
        *self.muted.write().await = muted;
    }

    pub async fn get_speed(&self) -> f64 {
        *self.speed.read().await
    }

    pub async fn set_speed(&self, speed: f64) {
        *self.speed.write().await = speed;
    }

    pub async fn get_error_message(&self) -> Option<String> {
        self.error_message.read().await.clone()
    }

    pub async fn set_error_message(&self, message: Option<String>) {
        *self.error_message.write().await = message;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
