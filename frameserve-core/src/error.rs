//! Error types for the frameserve library.
//!
//! The hierarchy mirrors the failure classes a track can hit: index
//! construction failures are fatal for opening, codec failures are fatal for
//! the track, and exhausted-retry decode failures are recoverable (the
//! session substitutes a blank frame or silence and the track stays usable).

use thiserror::Error;

/// Main error type for the frameserve library.
#[derive(Error, Debug)]
pub enum Error {
    /// Sample index / container metadata errors.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Decoder lifecycle and codec errors.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Frame/sample request failures after exhausting the retry policy.
    #[error("Decode failure: {0}")]
    Decode(#[from] DecodeError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No track matched the open-time selector.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// The track hit a failed mid-stream reconfiguration; all further
    /// requests fail until it is closed and reopened.
    #[error("Track is in error state; close and reopen")]
    TrackPoisoned,

    /// Invalid parameter provided by the caller.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Container metadata / sample index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The container library could not build a presentation timeline.
    #[error("Timeline construction failed for track {track_id}: {message}")]
    TimelineConstruction { track_id: u32, message: String },

    /// Per-sample metadata could not be read. No partial index is kept.
    #[error("Metadata read failed at sample {sample_number}: {message}")]
    MetadataRead { sample_number: u32, message: String },

    /// The track contains no samples.
    #[error("Track {track_id} has no samples")]
    EmptyTrack { track_id: u32 },

    /// The container does not support the requested seek basis.
    #[error("Seek basis not supported by container")]
    SeekBasisUnsupported,

    /// A supported seek could not be satisfied.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// Generic index error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for IndexError {
    fn from(s: String) -> Self {
        IndexError::Other(s)
    }
}

impl From<&str> for IndexError {
    fn from(s: &str) -> Self {
        IndexError::Other(s.to_string())
    }
}

/// Decoder lifecycle and codec errors.
#[derive(Error, Debug)]
pub enum CodecError {
    /// No codec identifier could be resolved from the container description.
    #[error("Unsupported codec: {0}")]
    Unsupported(String),

    /// The codec library refused to open a decoder.
    #[error("Decoder open failed: {0}")]
    OpenFailed(String),

    /// Trial decoding never produced valid output parameters.
    #[error("Parameter probe exhausted for configuration {config_index}")]
    ProbeExhausted { config_index: u32 },

    /// A mid-stream configuration switch failed. Poisons the track.
    #[error("Reconfiguration failed: {0}")]
    ReconfigurationFailed(String),

    /// One compressed unit failed to decode. Recoverable: the access
    /// engines may retry from an earlier random access point or, in
    /// aggressive mode, treat the unit as producing no output.
    #[error("Corrupt unit at sample {sample_number}")]
    CorruptUnit { sample_number: u32 },

    /// Hard library error; not retryable.
    #[error("Codec internal error: {0}")]
    Internal(String),

    /// Generic codec error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for CodecError {
    fn from(s: String) -> Self {
        CodecError::Other(s)
    }
}

impl From<&str> for CodecError {
    fn from(s: &str) -> Self {
        CodecError::Other(s.to_string())
    }
}

/// Access-engine failures after the bounded retry policy ran out.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// A video frame request exhausted its retries.
    #[error("Video frame {frame_number} undecodable after {attempts} attempts")]
    VideoRetriesExhausted { frame_number: u32, attempts: u32 },

    /// An audio sample-range request exhausted its retries.
    #[error("Audio samples at {position} undecodable after {attempts} attempts")]
    AudioRetriesExhausted { position: i64, attempts: u32 },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Check if this error is recoverable: the request failed but the track
    /// remains usable, and the caller receives the documented fallback
    /// (blank frame, silence-padded buffer).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Decode(_) | Error::Codec(CodecError::CorruptUnit { .. })
        )
    }

    /// Check if this error leaves the track in a persistent error state.
    #[must_use]
    pub fn poisons_track(&self) -> bool {
        matches!(
            self,
            Error::Codec(CodecError::ReconfigurationFailed(_)) | Error::TrackPoisoned
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("thread count".into());
        assert_eq!(err.to_string(), "Invalid parameter: thread count");
    }

    #[test]
    fn test_index_error_conversion() {
        let idx = IndexError::EmptyTrack { track_id: 2 };
        let err: Error = idx.into();
        assert!(matches!(err, Error::Index(IndexError::EmptyTrack { track_id: 2 })));
    }

    #[test]
    fn test_is_recoverable() {
        let recoverable = Error::Decode(DecodeError::VideoRetriesExhausted {
            frame_number: 45,
            attempts: 4,
        });
        assert!(recoverable.is_recoverable());

        let corrupt = Error::Codec(CodecError::CorruptUnit { sample_number: 7 });
        assert!(corrupt.is_recoverable());

        let fatal = Error::Codec(CodecError::OpenFailed("no such codec".into()));
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn test_poisons_track() {
        let err = Error::Codec(CodecError::ReconfigurationFailed("probe died".into()));
        assert!(err.poisons_track());
        assert!(!err.is_recoverable());

        let err = Error::Index(IndexError::SeekFailed("basis".into()));
        assert!(!err.poisons_track());
    }
}
