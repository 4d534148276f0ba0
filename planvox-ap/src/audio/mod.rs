//! Audio subsystem: decoding, playback clock, and device output

pub mod clock;
pub mod decode;
pub mod output;

pub use clock::{DeviceClock, MonotonicClock, PlaybackClock};
pub use decode::decode_pcm16;
pub use output::{AudioOutput, CpalOutput, NodeParams, OutputNode};

/// Decoded, playable audio buffer
///
/// Samples are interleaved f32 in [-1.0, 1.0].
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Interleaved samples, `channels` per frame
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl AudioBuffer {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Buffer duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer {
            samples: vec![0.0; 48000],
            sample_rate: 24000,
            channels: 1,
        };
        assert_eq!(buffer.frames(), 48000);
        assert_eq!(buffer.duration_secs(), 2.0);
    }

    #[test]
    fn test_stereo_frames() {
        let buffer = AudioBuffer {
            samples: vec![0.0; 100],
            sample_rate: 44100,
            channels: 2,
        };
        assert_eq!(buffer.frames(), 50);
    }
}
