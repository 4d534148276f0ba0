//! # planvox Audio Player Library (planvox-ap)
//!
//! Playback engine for text-to-speech study audio.
//!
//! **Purpose:** Resolve synthesized speech audio (cache or synthesis
//! service), decode raw PCM into playable buffers, and drive playback with
//! deterministic transport semantics: play/pause/seek/volume/mute/speed,
//! position tracking under a variable-speed device clock, and automatic
//! chaining across paragraphs and chapters on natural end-of-stream.
//!
//! **Architecture:** Single event-loop (tokio) with a generation token
//! invalidating stale async completions; at most one decoded buffer and one
//! live output node at any time.

pub mod audio;
pub mod error;
pub mod playback;
pub mod services;
pub mod state;

pub use error::{Error, Result};
pub use playback::TransportController;
pub use state::{SharedState, TrackRef};
