//! Container-library boundary.
//!
//! The demuxing library is an external collaborator; this module is its
//! contract. The library owns file parsing and timeline construction, and
//! hands us per-sample metadata, payloads, codec configuration records, and
//! a (possibly imprecise) seek. Everything above this seam (indexing,
//! seeking policy, decode scheduling) belongs to this repository.

use frameserve_core::error::Result;
use frameserve_core::packet::OwnedPacket;
use std::path::Path;

/// Media handler type of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    /// Video track.
    Video,
    /// Audio track.
    Audio,
}

/// Codec identifier resolved from the container description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecId {
    /// H.264/AVC.
    H264,
    /// H.265/HEVC.
    H265,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
    /// AAC.
    Aac,
    /// MP3.
    Mp3,
    /// Opus.
    Opus,
    /// FLAC.
    Flac,
    /// Uncompressed PCM.
    Pcm,
    /// The in-memory synthetic codec (tests and demos).
    Synthetic,
    /// Unresolvable codec; opening a decoder for it fails.
    Unknown(String),
}

impl CodecId {
    /// Whether this is a lossy audio codec. Lossy codecs prime their
    /// decoders and may need pre-roll even when the container declares no
    /// roll distance.
    pub fn is_lossy_audio(&self) -> bool {
        matches!(self, CodecId::Aac | CodecId::Mp3 | CodecId::Opus)
    }
}

/// Per-track parameters reported by the container.
#[derive(Debug, Clone)]
pub struct TrackDescription {
    /// Track identifier.
    pub track_id: u32,
    /// Handler type.
    pub handler: HandlerType,
    /// Media timescale (ticks per second).
    pub timescale: u32,
    /// Total number of samples.
    pub sample_count: u32,
    /// Priming (encoder delay) samples to trim from the front of the
    /// decoded stream. Audio only.
    pub priming_samples: u32,
    /// Silence prepended to the output timeline to cover an edit-list gap
    /// (A/V sync). In source-rate samples. Audio only.
    pub leading_silence: u64,
    /// Container-declared pre-roll distance in samples (frames). Audio only.
    pub preroll_distance: u32,
}

/// Per-sample metadata, addressed by decode-order sample number (1-origin).
#[derive(Debug, Clone, Copy)]
pub struct SampleMetadata {
    /// Decode-order sample number, 1-origin.
    pub sample_number: u32,
    /// Decode timestamp in media timescale units.
    pub dts: i64,
    /// Composition timestamp in media timescale units.
    pub cts: i64,
    /// Byte offset of the payload in the source file.
    pub byte_offset: u64,
    /// Sample duration in media timescale units.
    pub duration: u32,
    /// Random access point flag.
    pub is_random_access: bool,
    /// Leading sample flag (video): presentation precedes the random access
    /// point this sample follows in decode order.
    pub is_leading: bool,
    /// Decoder configuration entry required by this sample, 1-origin.
    pub config_index: u32,
}

/// Nominal video parameters from the container description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NominalVideoParams {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Nominal audio parameters from the container description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NominalAudioParams {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u32,
    /// Bits per sample.
    pub bits_per_sample: u32,
}

/// One codec configuration record: the immutable parameter snapshot stored
/// in the container description for a configuration index.
#[derive(Debug, Clone)]
pub struct ConfigRecord {
    /// Resolved codec identifier.
    pub codec: CodecId,
    /// Codec-specific parameter blob (extradata / parameter sets).
    pub extradata: Vec<u8>,
    /// Nominal video parameters, if a video configuration.
    pub video: Option<NominalVideoParams>,
    /// Nominal audio parameters, if an audio configuration.
    pub audio: Option<NominalAudioParams>,
}

/// Basis for a container-level seek. The engine picks whichever basis the
/// library supports, falling back to byte offsets (which tolerate
/// imprecision).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekBasis {
    /// Seek to a byte offset in the file.
    ByteOffset(u64),
    /// Seek to a decode timestamp in media timescale units.
    DecodeTime(i64),
    /// Seek to a composition timestamp in media timescale units.
    CompositionTime(i64),
}

/// A container-level seek request.
#[derive(Debug, Clone, Copy)]
pub struct SeekRequest {
    /// Track to position.
    pub track_id: u32,
    /// Seek basis.
    pub basis: SeekBasis,
    /// Permit landing on any sample, not only random access points. Used as
    /// a fallback when exact-match seeking fails.
    pub any_sample: bool,
}

/// Where a seek actually landed. `landed_sample` is `None` when the library
/// cannot tell; the caller verifies against the index in that case.
#[derive(Debug, Clone, Copy)]
pub struct SeekOutcome {
    /// Decode-order sample number the read cursor now points at, if known.
    pub landed_sample: Option<u32>,
}

/// The demuxing library, seen from this repository.
///
/// All sample numbers are decode-order and 1-origin. Implementations are
/// stateful: `seek` positions a per-track read cursor and `read_next`
/// advances it.
pub trait ContainerReader: Send {
    /// Number of tracks in the container.
    fn track_count(&self) -> u32;

    /// Track parameters by position (0-based enumeration order).
    fn track_by_position(&self, position: u32) -> Option<&TrackDescription>;

    /// Track parameters by track ID.
    fn track(&self, track_id: u32) -> Option<&TrackDescription>;

    /// Construct the random-accessible presentation timeline for a track.
    /// Must be called before sample metadata is read.
    fn construct_timeline(&mut self, track_id: u32) -> Result<()>;

    /// Read one sample's metadata.
    fn sample_metadata(&self, track_id: u32, sample_number: u32) -> Result<SampleMetadata>;

    /// Read one sample's payload bytes, with metadata attached.
    fn sample_payload(&mut self, track_id: u32, sample_number: u32) -> Result<OwnedPacket>;

    /// Number of codec configuration records for a track.
    fn config_count(&self, track_id: u32) -> u32;

    /// Read a codec configuration record (1-origin index).
    fn config_record(&self, track_id: u32, config_index: u32) -> Result<ConfigRecord>;

    /// Position the read cursor. May land earlier than requested; returns
    /// where it landed when the library knows.
    fn seek(&mut self, request: SeekRequest) -> Result<SeekOutcome>;

    /// Read the packet at the cursor and advance. `None` at end of track.
    fn read_next(&mut self, track_id: u32) -> Result<Option<OwnedPacket>>;

    /// Container-level metadata tags (key, value).
    fn metadata(&self) -> &[(String, String)];
}

/// Opens containers from paths. Implemented by integrations that bind a
/// real demuxing library; the library session owns the returned reader.
pub trait ContainerOpener: Send + Sync {
    /// Open a media file and parse enough structure to enumerate tracks.
    fn open(&self, path: &Path) -> Result<Box<dyn ContainerReader>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossy_audio_classification() {
        assert!(CodecId::Aac.is_lossy_audio());
        assert!(CodecId::Mp3.is_lossy_audio());
        assert!(!CodecId::Flac.is_lossy_audio());
        assert!(!CodecId::Pcm.is_lossy_audio());
        assert!(!CodecId::H264.is_lossy_audio());
    }
}
