//! Linear PCM timeline over the container's sample grid.
//!
//! Audio containers store frames of variable length whose sample rate may
//! change mid-stream; callers want a strictly linear PCM position space.
//! This module owns that mapping: maximal runs of constant
//! `(sample_rate, frame_length)` are rescaled to the output rate with
//! ceiling rounding, priming samples are trimmed from the front of the
//! source grid, and an optional leading-silence region covers an edit-list
//! A/V gap.
//!
//! The forward mapping (`total_samples`) and the inverse (`locate`) must
//! agree exactly: a fractional output sample at a run boundary is never
//! dropped, which is why every per-run total uses [`rescale_ceil`].

use crate::index::SampleIndex;
use crate::traits::HandlerType;
use frameserve_core::error::{Error, IndexError, Result};
use frameserve_core::rational::{rescale_ceil, rescale_floor};

/// A maximal run of frames with constant sample rate and frame length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmRun {
    /// First frame of the run, 1-origin.
    pub first_frame: u32,
    /// Number of frames in the run.
    pub frame_count: u32,
    /// Samples per frame, at the source rate.
    pub frame_length: u32,
    /// Source sample rate of the run in Hz.
    pub sample_rate: u32,
}

impl PcmRun {
    fn source_samples(&self) -> u64 {
        self.frame_count as u64 * self.frame_length as u64
    }
}

/// Result of inverting a PCM output position back onto the source grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmLocation {
    /// Frame holding the first needed source sample, 1-origin.
    pub frame_number: u32,
    /// Source-rate samples to discard from the start of that frame before
    /// any output is produced.
    pub discard: u64,
    /// Initial resampler phase numerator (denominator: output rate) so a
    /// mid-run start produces the same samples a start-of-run pass would.
    pub phase: u64,
    /// Source sample rate at the located frame.
    pub sample_rate: u32,
}

/// The per-track PCM timeline.
#[derive(Debug, Clone)]
pub struct PcmTimeline {
    runs: Vec<PcmRun>,
    /// Priming samples trimmed from the front of the source grid.
    priming: u64,
    /// Silence prepended to the output timeline, in source-rate samples of
    /// the first run.
    leading_silence: u64,
}

impl PcmTimeline {
    /// Build the timeline from an audio track's index. Pure metadata; no
    /// decoding.
    pub fn from_index(index: &SampleIndex) -> Result<Self> {
        let track = index.track();
        if track.handler != HandlerType::Audio {
            return Err(Error::invalid_param("PCM timeline requires an audio track"));
        }
        let timescale = track.timescale.max(1);

        let mut runs: Vec<PcmRun> = Vec::new();
        for number in 1..=index.sample_count() {
            let desc = index
                .descriptor(number)
                .ok_or_else(|| Error::Index(IndexError::Other("descriptor gap".into())))?;
            let config = index
                .config_records()
                .get((desc.config_index.max(1) - 1) as usize)
                .and_then(|(record, _)| record.audio.as_ref())
                .ok_or_else(|| {
                    Error::Index(IndexError::Other(format!(
                        "sample {} references configuration {} without audio parameters",
                        number, desc.config_index
                    )))
                })?;

            let rate = config.sample_rate.max(1);
            // Frame length on the source sample grid. Durations are stored
            // in media timescale units; the common case is
            // timescale == sample_rate where this is the identity.
            let frame_length =
                (desc.duration as u64 * rate as u64 / timescale as u64) as u32;

            match runs.last_mut() {
                Some(run)
                    if run.sample_rate == rate && run.frame_length == frame_length =>
                {
                    run.frame_count += 1;
                }
                _ => runs.push(PcmRun {
                    first_frame: number,
                    frame_count: 1,
                    frame_length,
                    sample_rate: rate,
                }),
            }
        }

        Ok(Self {
            runs,
            priming: track.priming_samples as u64,
            leading_silence: track.leading_silence,
        })
    }

    /// The run table.
    pub fn runs(&self) -> &[PcmRun] {
        &self.runs
    }

    /// Priming samples trimmed from the front of the source grid.
    pub fn priming(&self) -> u64 {
        self.priming
    }

    /// Length of the prepended silence region at the output rate.
    pub fn leading_silence_output(&self, output_rate: u32) -> u64 {
        let rate = self.runs.first().map(|r| r.sample_rate).unwrap_or(output_rate);
        rescale_ceil(self.leading_silence, rate, output_rate)
    }

    /// Total PCM samples the track yields at `output_rate`: the prepended
    /// silence plus, per run, the ceiling-rescaled post-priming source
    /// samples. Monotonic in every component by construction.
    pub fn total_samples(&self, output_rate: u32) -> u64 {
        let mut total = self.leading_silence_output(output_rate);
        let mut remaining_priming = self.priming;
        for run in &self.runs {
            let available = run.source_samples();
            let consumed = remaining_priming.min(available);
            remaining_priming -= consumed;
            let effective = available - consumed;
            total += rescale_ceil(effective, run.sample_rate, output_rate);
        }
        total
    }

    /// Invert an output position (counted from the end of the silence
    /// region) onto the source grid.
    ///
    /// Returns the frame to start decoding at, how many source samples of
    /// decoded output to discard before the requested position, and the
    /// resampler phase that makes a mid-run start bit-exact with a
    /// start-of-run pass.
    pub fn locate(&self, position: u64, output_rate: u32) -> Option<PcmLocation> {
        let mut out_before = 0u64;
        let mut remaining_priming = self.priming;
        for run in &self.runs {
            let available = run.source_samples();
            let consumed = remaining_priming.min(available);
            remaining_priming -= consumed;
            let effective = available - consumed;
            let out_in_run = rescale_ceil(effective, run.sample_rate, output_rate);

            if position < out_before + out_in_run {
                let p = position - out_before;
                // Source index within the effective (post-priming) samples.
                let src_eff = rescale_floor(p, run.sample_rate, output_rate);
                let phase = p * run.sample_rate as u64 - src_eff * output_rate as u64;
                // Absolute source index within the run, priming included.
                let src_in_run = consumed + src_eff;
                let frame_offset = (src_in_run / run.frame_length.max(1) as u64) as u32;
                let discard = src_in_run % run.frame_length.max(1) as u64;
                return Some(PcmLocation {
                    frame_number: run.first_frame + frame_offset,
                    discard,
                    phase,
                    sample_rate: run.sample_rate,
                });
            }
            out_before += out_in_run;
        }
        None
    }

    /// Frame length in source samples of frame `number`.
    pub fn frame_length(&self, number: u32) -> Option<u32> {
        self.run_of(number).map(|r| r.frame_length)
    }

    /// Source sample rate at frame `number`.
    pub fn rate_of_frame(&self, number: u32) -> Option<u32> {
        self.run_of(number).map(|r| r.sample_rate)
    }

    /// Step `frame` backward by `distance` frames for pre-roll, returning
    /// the new frame number and the source samples the step adds to the
    /// discard count.
    pub fn preroll_step(&self, frame: u32, distance: u32) -> (u32, u64) {
        let mut current = frame;
        let mut added = 0u64;
        for _ in 0..distance {
            if current <= 1 {
                break;
            }
            current -= 1;
            added += self.frame_length(current).unwrap_or(0) as u64;
        }
        (current, added)
    }

    /// Index into [`runs`](Self::runs) of the run containing a frame.
    pub fn run_index_of(&self, number: u32) -> Option<usize> {
        self.runs
            .iter()
            .take_while(|r| r.first_frame <= number)
            .position(|r| number < r.first_frame + r.frame_count)
    }

    /// Override the priming count, e.g. from a metadata heuristic when the
    /// container's sample tables declare none.
    #[must_use]
    pub fn with_priming(mut self, priming: u64) -> Self {
        self.priming = priming;
        self
    }

    fn run_of(&self, number: u32) -> Option<&PcmRun> {
        self.runs
            .iter()
            .take_while(|r| r.first_frame <= number)
            .find(|r| number < r.first_frame + r.frame_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(runs: Vec<PcmRun>, priming: u64, silence: u64) -> PcmTimeline {
        PcmTimeline {
            runs,
            priming,
            leading_silence: silence,
        }
    }

    fn single_run(frames: u32, len: u32, rate: u32) -> Vec<PcmRun> {
        vec![PcmRun {
            first_frame: 1,
            frame_count: frames,
            frame_length: len,
            sample_rate: rate,
        }]
    }

    #[test]
    fn test_total_same_rate() {
        let tl = timeline(single_run(100, 1024, 48000), 0, 0);
        assert_eq!(tl.total_samples(48000), 102_400);
    }

    #[test]
    fn test_total_trims_priming() {
        let tl = timeline(single_run(100, 1024, 48000), 448, 0);
        assert_eq!(tl.total_samples(48000), 102_400 - 448);
    }

    #[test]
    fn test_total_cross_rate_rounds_up_per_run() {
        // Two runs at different rates: totals are ceil-rescaled per run,
        // not over the concatenation.
        let runs = vec![
            PcmRun { first_frame: 1, frame_count: 10, frame_length: 1024, sample_rate: 44100 },
            PcmRun { first_frame: 11, frame_count: 10, frame_length: 512, sample_rate: 22050 },
        ];
        let tl = timeline(runs, 0, 0);
        let expected =
            rescale_ceil(10 * 1024, 44100, 48000) + rescale_ceil(10 * 512, 22050, 48000);
        assert_eq!(tl.total_samples(48000), expected);
    }

    #[test]
    fn test_leading_silence_counted() {
        let tl = timeline(single_run(10, 100, 48000), 0, 96);
        assert_eq!(tl.total_samples(48000), 1000 + 96);
        assert_eq!(tl.leading_silence_output(24000), 48);
    }

    #[test]
    fn test_locate_same_rate() {
        let tl = timeline(single_run(100, 1024, 48000), 0, 0);
        let loc = tl.locate(0, 48000).unwrap();
        assert_eq!(loc.frame_number, 1);
        assert_eq!(loc.discard, 0);
        assert_eq!(loc.phase, 0);

        let loc = tl.locate(1024, 48000).unwrap();
        assert_eq!(loc.frame_number, 2);
        assert_eq!(loc.discard, 0);

        let loc = tl.locate(1500, 48000).unwrap();
        assert_eq!(loc.frame_number, 2);
        assert_eq!(loc.discard, 1500 - 1024);
    }

    #[test]
    fn test_locate_accounts_for_priming() {
        let tl = timeline(single_run(100, 1024, 48000), 448, 0);
        // Output position 0 is source position 448: frame 1, discard 448.
        let loc = tl.locate(0, 48000).unwrap();
        assert_eq!(loc.frame_number, 1);
        assert_eq!(loc.discard, 448);
        // Position 1024-448 is the start of frame 2.
        let loc = tl.locate(1024 - 448, 48000).unwrap();
        assert_eq!(loc.frame_number, 2);
        assert_eq!(loc.discard, 0);
    }

    #[test]
    fn test_locate_cross_rate_phase() {
        let tl = timeline(single_run(100, 1024, 44100), 0, 0);
        // Output position p needs source floor(p*44100/48000) with the
        // fractional remainder carried as phase.
        let loc = tl.locate(1000, 48000).unwrap();
        let src = 1000u64 * 44100 / 48000;
        assert_eq!(
            loc.frame_number as u64 - 1,
            src / 1024
        );
        assert_eq!(loc.discard, src % 1024);
        assert_eq!(loc.phase, 1000 * 44100 - src * 48000);
        assert!(loc.phase < 48000);
    }

    #[test]
    fn test_locate_past_end_is_none() {
        let tl = timeline(single_run(10, 100, 48000), 0, 0);
        assert!(tl.locate(1000, 48000).is_none());
        assert!(tl.locate(999, 48000).is_some());
    }

    #[test]
    fn test_locate_total_consistency_across_rates() {
        // Every output position below the (silence-free) total must locate.
        let runs = vec![
            PcmRun { first_frame: 1, frame_count: 7, frame_length: 999, sample_rate: 44100 },
            PcmRun { first_frame: 8, frame_count: 5, frame_length: 512, sample_rate: 32000 },
        ];
        let tl = timeline(runs, 100, 0);
        let total = tl.total_samples(48000);
        for p in [0, 1, total / 2, total - 1] {
            assert!(tl.locate(p, 48000).is_some(), "position {} must locate", p);
        }
        assert!(tl.locate(total, 48000).is_none());
    }

    #[test]
    fn test_preroll_step() {
        let tl = timeline(single_run(10, 1024, 48000), 0, 0);
        assert_eq!(tl.preroll_step(5, 2), (3, 2048));
        // Clamps at the first frame.
        assert_eq!(tl.preroll_step(2, 5), (1, 1024));
    }
}
