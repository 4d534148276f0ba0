//! Playback engine: transport control, generation pipeline, and chaining

pub mod chain;
pub mod controller;
pub mod pipeline;

pub use chain::{chapter_chain, paragraph_chain, play_chapter, play_paragraph, play_summary};
pub use controller::{EndOfTrackHook, TransportController};
pub use pipeline::{cache_key, resolve_audio};
