//! Track-open options shared by the engines and the session.

use frameserve_core::sample::SampleFormat;

/// How far the seek-and-retry machinery may go when decoding fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekSafety {
    /// Walk back through random access points, then escalate to an
    /// error-tolerant re-decode pass (default).
    #[default]
    Safe,
    /// Start tolerant: individual unit decode errors are treated as empty
    /// output from the first attempt.
    Aggressive,
    /// Never tolerate unit decode errors; fail after the RAP retries.
    Unsafe,
}

/// Host output sink shape, selected at track-open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    /// The decoded frame untouched.
    #[default]
    Native,
    /// Packed BGRA rows, optionally bottom-up.
    PackedBgra {
        /// Deliver rows bottom-up.
        bottom_up: bool,
    },
    /// Planar YUV 4:2:0.
    PlanarYuv,
}

/// Options for opening one track.
#[derive(Debug, Clone)]
pub struct TrackOptions {
    /// Decoder thread count for production decoding. Probing always runs
    /// single-threaded.
    pub thread_count: u32,
    /// Maximum frames ahead of the last delivered frame served by decoding
    /// forward without a seek.
    pub forward_seek_threshold: u32,
    /// Retry escalation policy.
    pub seek_safety: SeekSafety,
    /// Apply the named `iTunSMPB` priming heuristic when the container
    /// declares none.
    pub itunes_priming_heuristic: bool,
    /// Output PCM rate; `None` keeps the source rate of the first run.
    pub output_sample_rate: Option<u32>,
    /// Output PCM sample format.
    pub audio_format: SampleFormat,
    /// Video output sink shape.
    pub sink: SinkKind,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            thread_count: 1,
            forward_seek_threshold: 16,
            seek_safety: SeekSafety::Safe,
            itunes_priming_heuristic: true,
            output_sample_rate: None,
            audio_format: SampleFormat::F32,
            sink: SinkKind::Native,
        }
    }
}
