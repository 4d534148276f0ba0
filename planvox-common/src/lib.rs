//! # planvox Common Library
//!
//! Shared code for the planvox study-audio player:
//! - Event types (PlayerEvent enum) and playback status
//! - Audio configuration (voice + speed) with JSON persistence
//! - Study document model (chapters, paragraphs)
//! - Common error type

pub mod config;
pub mod document;
pub mod error;
pub mod events;

pub use config::{AudioConfig, AudioConfigStore, Voice};
pub use document::{Chapter, Document, SourceFile, SourceMaterial};
pub use error::{Error, Result};
pub use events::{PlaybackStatus, PlayerEvent};
