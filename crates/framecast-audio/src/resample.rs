//! Sample-rate conversion to the Opus rate
//!
//! Wraps an FFT resampler behind an interleaved-i16 push interface: the
//! capture side feeds whatever rate the hardware produced, the encode side
//! drains 48 kHz samples. Input is buffered internally until a full
//! resampler chunk is available.

use rubato::{FftFixedIn, Resampler};

use crate::error::{AudioError, Result};

/// Frames fed to the FFT resampler per process call
const CHUNK_FRAMES: usize = 1024;

/// Interleaved i16 resampler to 48 kHz
pub struct Resampler48k {
    inner: FftFixedIn<f32>,
    channels: usize,
    pending: Vec<i16>,
    planar_in: Vec<Vec<f32>>,
}

impl Resampler48k {
    /// Create a converter from `in_hz` to 48 kHz
    pub fn new(in_hz: u32, channels: usize) -> Result<Self> {
        let inner = FftFixedIn::<f32>::new(in_hz as usize, 48_000, CHUNK_FRAMES, 2, channels)
            .map_err(|err| AudioError::Resample(err.to_string()))?;
        Ok(Self {
            inner,
            channels,
            pending: Vec::new(),
            planar_in: vec![vec![0.0; CHUNK_FRAMES]; channels],
        })
    }

    /// Feed interleaved samples; append converted output to `out`
    ///
    /// Whole resampler chunks are converted immediately; the remainder is
    /// buffered for the next call.
    pub fn push(&mut self, interleaved: &[i16], out: &mut Vec<i16>) -> Result<()> {
        self.pending.extend_from_slice(interleaved);

        let chunk_samples = CHUNK_FRAMES * self.channels;
        while self.pending.len() >= chunk_samples {
            for frame in 0..CHUNK_FRAMES {
                for ch in 0..self.channels {
                    self.planar_in[ch][frame] =
                        self.pending[frame * self.channels + ch] as f32 / 32768.0;
                }
            }

            let planar_out = self
                .inner
                .process(&self.planar_in, None)
                .map_err(|err| AudioError::Resample(err.to_string()))?;

            let out_frames = planar_out.first().map(Vec::len).unwrap_or(0);
            out.reserve(out_frames * self.channels);
            for frame in 0..out_frames {
                for ch in 0..self.channels {
                    let sample = (planar_out[ch][frame] * 32767.0).clamp(-32768.0, 32767.0);
                    out.push(sample as i16);
                }
            }

            self.pending.drain(..chunk_samples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_44100_to_48000_ratio() {
        let mut resampler = Resampler48k::new(44_100, 2).expect("resampler");
        let mut out = Vec::new();

        // 8 full chunks of interleaved stereo silence
        let input = vec![0i16; CHUNK_FRAMES * 2 * 8];
        resampler.push(&input, &mut out).expect("push");

        let in_frames = (CHUNK_FRAMES * 8) as f64;
        let out_frames = (out.len() / 2) as f64;
        let expected = in_frames * 48_000.0 / 44_100.0;
        // FFT resampler delay keeps some frames internal; allow slack
        assert!(
            out_frames > expected * 0.7 && out_frames < expected * 1.1,
            "out_frames={out_frames}, expected≈{expected}"
        );
    }

    #[test]
    fn test_partial_chunk_is_buffered() {
        let mut resampler = Resampler48k::new(44_100, 2).expect("resampler");
        let mut out = Vec::new();

        // Half a chunk produces nothing yet
        resampler
            .push(&vec![0i16; CHUNK_FRAMES], &mut out)
            .expect("push");
        assert!(out.is_empty());

        // Completing the chunk produces output
        resampler
            .push(&vec![0i16; CHUNK_FRAMES], &mut out)
            .expect("push");
        assert!(!out.is_empty());
        // Output stays interleaved stereo
        assert_eq!(out.len() % 2, 0);
    }
}
