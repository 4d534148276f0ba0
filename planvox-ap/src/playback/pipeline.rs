//! Generation pipeline
//!
//! Resolves the audio bytes for a piece of text: consult the durable cache
//! first, otherwise call the speech synthesis service and write the result
//! back through. Cache failures are logged and treated as misses; a
//! cache-write failure must never fail playback.
//!
//! The pipeline itself never mutates controller-visible state; the
//! transport controller validates its generation token after every await
//! before applying the result.

use crate::error::{Error, Result};
use crate::services::{AudioCache, SpeechSynthesizer};
use planvox_common::config::Voice;
use tracing::{debug, info, warn};

/// Sample rate of raw PCM returned by the synthesis service
pub const SYNTHESIS_SAMPLE_RATE: u32 = 24_000;

/// Channel count of raw PCM returned by the synthesis service
pub const SYNTHESIS_CHANNELS: u16 = 1;

/// Cache key for a (voice, text) pair
pub fn cache_key(voice: Voice, text: &str) -> String {
    format!("{}::{}", voice.as_str(), text)
}

/// Resolve raw audio bytes for `text`, preferring the cache
pub async fn resolve_audio(
    cache: &dyn AudioCache,
    synthesizer: &dyn SpeechSynthesizer,
    voice: Voice,
    text: &str,
) -> Result<Vec<u8>> {
    if text.trim().is_empty() {
        return Err(Error::InvalidText(
            "Cannot generate audio for empty text".to_string(),
        ));
    }

    let key = cache_key(voice, text);

    match cache.get(&key).await {
        Ok(Some(bytes)) => {
            debug!("Cache hit, {} bytes", bytes.len());
            return Ok(bytes);
        }
        Ok(None) => {}
        Err(e) => {
            // Treat a failing cache as a miss
            warn!("Audio cache read failed: {}", e);
        }
    }

    info!(
        "Cache miss, synthesizing {} chars with voice {}",
        text.len(),
        voice
    );
    let bytes = synthesizer.synthesize(text, voice).await?;

    // Write-through; failure here must not fail the playback
    if let Err(e) = cache.put(&key, &bytes).await {
        warn!("Audio cache write failed: {}", e);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key(Voice::Kore, "hello"), "Kore::hello");
        assert_eq!(cache_key(Voice::Puck, "a::b"), "Puck::a::b");
    }

    #[test]
    fn test_cache_key_voice_scoped() {
        assert_ne!(
            cache_key(Voice::Kore, "same"),
            cache_key(Voice::Zephyr, "same")
        );
    }
}
