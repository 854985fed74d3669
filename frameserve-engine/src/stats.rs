//! Per-track access statistics.

/// Counters accumulated over the life of an open track.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackStats {
    /// Video frames delivered (decoded content).
    pub frames_delivered: u64,
    /// Blank fallback frames substituted for undecodable requests.
    pub blank_frames: u64,
    /// PCM samples delivered (decoded content, per channel).
    pub samples_delivered: u64,
    /// Silence samples substituted or prepended (per channel).
    pub silence_samples: u64,
    /// Container-level seeks issued.
    pub seeks: u64,
    /// Random-access-point retry attempts.
    pub retries: u64,
    /// Error-tolerant re-decode passes.
    pub aggressive_passes: u64,
    /// Sequential fast-path continuations.
    pub fast_path_hits: u64,
    /// Decoder configuration switches after the first activation.
    pub reconfigurations: u64,
}
