//! Event types for the planvox event system

use serde::{Deserialize, Serialize};

/// Playback status for the transport controller
///
/// Statuses are mutually exclusive. `Error` carries its message in the
/// shared state, not in the status itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "idle"),
            PlaybackStatus::Loading => write!(f, "loading"),
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::Error => write!(f, "error"),
        }
    }
}

/// planvox event types
///
/// Broadcast by the transport controller on every state transition so that
/// UI layers and chaining policies can react without polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playback status changed
    PlaybackStateChanged {
        status: PlaybackStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track started playing
    TrackStarted {
        chapter_index: Option<usize>,
        segment_index: Option<i32>,
        title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track finished
    ///
    /// `completed` is true only for natural end-of-stream; explicit stop
    /// emits `completed: false` and never triggers chaining.
    TrackFinished {
        chapter_index: Option<usize>,
        segment_index: Option<i32>,
        title: String,
        completed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position update (sent periodically while playing)
    PlaybackProgress {
        position_secs: f64,
        duration_secs: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume or mute changed
    VolumeChanged {
        volume: f32,
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback speed changed
    SpeedChanged {
        speed: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A generation or playback attempt failed
    PlaybackError {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}
