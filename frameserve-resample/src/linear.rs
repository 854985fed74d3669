//! Linear interpolation resampler with exact integer phase accounting.
//!
//! Output sample `n` sits at source position `(n * input_rate + phase) /
//! output_rate`, tracked in integers. Feeding a run of `s` source frames
//! and flushing therefore emits exactly `ceil((s*output_rate - phase) /
//! input_rate)` frames, the same ceiling accounting the PCM timeline uses,
//! so cumulative counts never drift from the index's arithmetic.

use crate::error::{ResampleError, Result};
use crate::ResamplerImpl;

/// Linear interpolation resampler.
///
/// Interpolates between adjacent source frames. Quality is modest but the
/// sample accounting is exact, which is the property the audio engine
/// depends on.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    /// Phase numerator; denominator is `output_rate`.
    phase: u64,
    /// Output frames emitted since reset.
    next_out: u64,
    /// Source frames consumed since reset.
    consumed: u64,
    /// The most recent source frame, one value per channel.
    prev: Vec<f32>,
}

impl LinearResampler {
    /// Create a resampler starting at phase zero.
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self> {
        Self::with_phase(input_rate, output_rate, channels, 0)
    }

    /// Create a resampler with an initial phase numerator in
    /// `0..output_rate`. A mid-stream start with the phase produced by the
    /// timeline inversion emits exactly the samples a from-the-start pass
    /// would from that position on.
    pub fn with_phase(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
        phase: u64,
    ) -> Result<Self> {
        if input_rate == 0 {
            return Err(ResampleError::InvalidSampleRate { rate: input_rate });
        }
        if output_rate == 0 {
            return Err(ResampleError::InvalidSampleRate { rate: output_rate });
        }
        if channels == 0 {
            return Err(ResampleError::InvalidChannelCount { count: channels });
        }
        Ok(Self {
            input_rate,
            output_rate,
            channels,
            phase,
            next_out: 0,
            consumed: 0,
            prev: vec![0.0; channels],
        })
    }

    /// Input sample rate.
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Output sample rate.
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    #[inline]
    fn interpolate(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Source frame `idx` (global since reset) out of the current chunk.
    /// Only indices from `consumed - 1` upward are ever requested.
    #[inline]
    fn frame_at<'a>(&'a self, input: &'a [f32], idx: u64, channel: usize) -> f32 {
        if idx >= self.consumed {
            input[(idx - self.consumed) as usize * self.channels + channel]
        } else {
            self.prev[channel]
        }
    }
}

impl ResamplerImpl for LinearResampler {
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() % self.channels != 0 {
            return Err(ResampleError::MisalignedInput {
                len: input.len(),
                channels: self.channels,
            });
        }
        let frames_in = (input.len() / self.channels) as u64;
        let available = self.consumed + frames_in;
        let in_rate = self.input_rate as u64;
        let out_rate = self.output_rate as u64;

        let mut output = Vec::new();
        loop {
            let num = self.next_out * in_rate + self.phase;
            let idx = num / out_rate;
            let frac_num = num % out_rate;
            if idx >= available {
                break;
            }
            if frac_num != 0 && idx + 1 >= available {
                // The successor frame has not arrived; emitted on the next
                // chunk or at flush.
                break;
            }
            for ch in 0..self.channels {
                let s0 = self.frame_at(input, idx, ch);
                let value = if frac_num == 0 {
                    s0
                } else {
                    let s1 = self.frame_at(input, idx + 1, ch);
                    Self::interpolate(s0, s1, frac_num as f32 / out_rate as f32)
                };
                output.push(value);
            }
            self.next_out += 1;
        }

        if frames_in > 0 {
            let last = (frames_in as usize - 1) * self.channels;
            self.prev.copy_from_slice(&input[last..last + self.channels]);
        }
        self.consumed = available;
        Ok(output)
    }

    fn flush(&mut self) -> Result<Vec<f32>> {
        // Emit the boundary samples held back for a successor frame that
        // will never arrive, duplicating the final frame.
        let in_rate = self.input_rate as u64;
        let out_rate = self.output_rate as u64;
        let mut output = Vec::new();
        loop {
            let num = self.next_out * in_rate + self.phase;
            let idx = num / out_rate;
            if idx >= self.consumed {
                break;
            }
            output.extend_from_slice(&self.prev);
            self.next_out += 1;
        }
        Ok(output)
    }

    fn reset(&mut self, phase: u64) {
        self.phase = phase;
        self.next_out = 0;
        self.consumed = 0;
        self.prev.iter_mut().for_each(|v| *v = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_after_flush(
        resampler: &mut LinearResampler,
        chunks: &[Vec<f32>],
    ) -> usize {
        let mut count = 0;
        for chunk in chunks {
            count += resampler.process(chunk).unwrap().len();
        }
        count + resampler.flush().unwrap().len()
    }

    #[test]
    fn test_identity_passthrough() {
        let mut r = LinearResampler::new(48000, 48000, 1).unwrap();
        let out = r.process(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
        assert!(r.flush().unwrap().is_empty());
    }

    #[test]
    fn test_exact_downsample_by_two() {
        let mut r = LinearResampler::new(48000, 24000, 1).unwrap();
        let out = r.process(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, vec![0.0, 2.0]);
        assert!(r.flush().unwrap().is_empty());
    }

    #[test]
    fn test_upsample_by_two_interpolates() {
        let mut r = LinearResampler::new(24000, 48000, 1).unwrap();
        let mut out = r.process(&[0.0, 1.0]).unwrap();
        out.extend(r.flush().unwrap());
        // ceil(2 * 48000 / 24000) = 4 samples; the held tail duplicates.
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_count_matches_ceiling_rescale() {
        // ceil(1024 * 48000 / 44100) = 1115
        let mut r = LinearResampler::new(44100, 48000, 2).unwrap();
        let input = vec![0.5f32; 1024 * 2];
        let total = total_after_flush(&mut r, &[input]);
        assert_eq!(total / 2, 1115);
    }

    #[test]
    fn test_count_independent_of_chunking() {
        let source: Vec<f32> = (0..999).map(|i| (i % 7) as f32).collect();

        let mut whole = LinearResampler::new(44100, 48000, 1).unwrap();
        let total_whole = total_after_flush(&mut whole, &[source.clone()]);

        let mut chunked = LinearResampler::new(44100, 48000, 1).unwrap();
        let chunks: Vec<Vec<f32>> = source.chunks(100).map(|c| c.to_vec()).collect();
        let total_chunked = total_after_flush(&mut chunked, &chunks);

        assert_eq!(total_whole, total_chunked);
        assert_eq!(total_whole as u64, (999u64 * 48000 - 1) / 44100 + 1);
    }

    #[test]
    fn test_phase_offsets_skip_initial_output() {
        // A fresh pass over 100 samples...
        let source: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut full = LinearResampler::new(44100, 48000, 1).unwrap();
        let mut full_out = full.process(&source).unwrap();
        full_out.extend(full.flush().unwrap());

        // ...must agree with a mid-stream start at output position 50.
        let p = 50u64;
        let src = p * 44100 / 48000;
        let phase = p * 44100 - src * 48000;
        let mut mid = LinearResampler::with_phase(44100, 48000, 1, phase).unwrap();
        let mut mid_out = mid.process(&source[src as usize..]).unwrap();
        mid_out.extend(mid.flush().unwrap());

        let tail = &full_out[p as usize..];
        assert_eq!(mid_out.len(), tail.len());
        for (a, b) in mid_out.iter().zip(tail.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_invalid_construction() {
        assert!(LinearResampler::new(0, 48000, 1).is_err());
        assert!(LinearResampler::new(48000, 0, 1).is_err());
        assert!(LinearResampler::new(48000, 48000, 0).is_err());
    }

    #[test]
    fn test_misaligned_input_rejected() {
        let mut r = LinearResampler::new(48000, 48000, 2).unwrap();
        assert!(r.process(&[0.0, 1.0, 2.0]).is_err());
    }
}
