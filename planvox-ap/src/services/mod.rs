//! External service seams
//!
//! Traits for the collaborators the player depends on but does not own:
//! speech synthesis, plan generation, summaries, and the durable audio
//! cache. HTTP adapters live in [`http`]; the SQLite cache in [`cache`].

pub mod cache;
pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use planvox_common::config::Voice;
use planvox_common::document::{Document, SourceMaterial};

pub use cache::SqliteAudioCache;
pub use http::{HttpPlanGenerator, HttpSummarizer, HttpSynthesizer};

/// Speech synthesis service
///
/// Takes text and a voice identifier and returns raw PCM16LE audio bytes
/// (base64 transport decoding is the adapter's concern).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>>;
}

/// Durable key/value audio cache
///
/// Keys are `voice::text`. Absence is not an error; adapter failures are
/// logged by the pipeline and treated as misses.
#[async_trait]
pub trait AudioCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Plan generation service
///
/// Turns source material and a topic into a structured study document.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(
        &self,
        source: &SourceMaterial,
        topic: &str,
        extra_topics: &[String],
    ) -> Result<Document>;
}

/// Chapter summary service
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, content: &str) -> Result<String>;
}
