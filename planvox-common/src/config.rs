//! Audio configuration loading and persistence
//!
//! The audio configuration (voice selection and playback speed) survives
//! across tracks and across process restarts. It is stored as a small JSON
//! object in the platform config directory and written back on every change.
//! Missing or corrupt data falls back to defaults rather than failing.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default playback speed multiplier
pub const DEFAULT_SPEED: f64 = 1.0;

/// Named synthesis voices supported by the speech service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Voice {
    #[default]
    Kore,
    Puck,
    Zephyr,
    Charon,
    Fenrir,
}

impl Voice {
    /// Stable identifier used in cache keys and service requests
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Kore => "Kore",
            Voice::Puck => "Puck",
            Voice::Zephyr => "Zephyr",
            Voice::Charon => "Charon",
            Voice::Fenrir => "Fenrir",
        }
    }

    /// All known voices, for CLI listing and validation
    pub fn all() -> &'static [Voice] {
        &[
            Voice::Kore,
            Voice::Puck,
            Voice::Zephyr,
            Voice::Charon,
            Voice::Fenrir,
        ]
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Voice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Voice::all()
            .iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::Config(format!("Unknown voice: {}", s)))
    }
}

/// Persisted audio configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub voice: Voice,

    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_speed() -> f64 {
    DEFAULT_SPEED
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            voice: Voice::Kore,
            speed: DEFAULT_SPEED,
        }
    }
}

impl AudioConfig {
    /// Replace invalid fields with defaults
    ///
    /// Speed must be a finite positive number; anything else (including
    /// values deserialized from hand-edited files) reverts to 1.0.
    fn sanitized(mut self) -> Self {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            warn!("Invalid persisted speed {:?}, using default", self.speed);
            self.speed = DEFAULT_SPEED;
        }
        self
    }
}

/// Durable store for the audio configuration
///
/// Reads happen once at startup; writes happen on every change.
#[derive(Debug, Clone)]
pub struct AudioConfigStore {
    path: PathBuf,
}

impl AudioConfigStore {
    /// Create a store backed by an explicit file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a store at the platform default location
    ///
    /// Resolves to `<config_dir>/planvox/audio.json`.
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(Self::new(dir.join("planvox").join("audio.json")))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults
    ///
    /// A missing file, unreadable file, or unparseable JSON all yield the
    /// default configuration. Field-level validation is applied on top.
    pub fn load(&self) -> AudioConfig {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return AudioConfig::default(),
        };

        match serde_json::from_str::<AudioConfig>(&contents) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                warn!(
                    "Corrupt audio config at {}: {}, using defaults",
                    self.path.display(),
                    e
                );
                AudioConfig::default()
            }
        }
    }

    /// Persist the configuration, creating parent directories as needed
    pub fn save(&self, config: &AudioConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
