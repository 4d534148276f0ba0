//! Raw PCM audio decoding
//!
//! The speech synthesis service delivers raw interleaved PCM (signed
//! 16-bit little-endian; the HTTP adapter strips the base64 transport
//! encoding). This module converts those bytes into an [`AudioBuffer`] of
//! normalized f32 samples. Decoding is pure: it has no side effects on
//! shared state.

use crate::audio::AudioBuffer;
use crate::error::{Error, Result};
use tracing::debug;

/// Decode raw interleaved PCM16LE bytes into a playable buffer
///
/// Samples are normalized to [-1.0, 1.0]. A byte length that is not a
/// multiple of one frame (2 bytes x channels) truncates the trailing
/// partial frame rather than failing. Empty input is an error.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioBuffer> {
    if bytes.is_empty() {
        return Err(Error::Decode("Empty audio payload".to_string()));
    }
    if channels == 0 {
        return Err(Error::Decode("Channel count must be non-zero".to_string()));
    }
    if sample_rate == 0 {
        return Err(Error::Decode("Sample rate must be non-zero".to_string()));
    }

    let frame_bytes = 2 * channels as usize;
    let usable = bytes.len() - (bytes.len() % frame_bytes);
    if usable < bytes.len() {
        debug!(
            "Truncating {} trailing bytes of partial PCM frame",
            bytes.len() - usable
        );
    }
    if usable == 0 {
        return Err(Error::Decode(
            "Audio payload shorter than one frame".to_string(),
        ));
    }

    let samples: Vec<f32> = bytes[..usable]
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
        .collect();

    Ok(AudioBuffer {
        samples,
        sample_rate,
        channels,
    })
}
