//! # frameserve
//!
//! A frame-accurate random-access media source. Container demuxing and
//! codec decoding live behind boundary traits; everything between those
//! seams is here: per-track sample indexing, decoder configuration
//! management with trial-decode probing, a video engine that replays from
//! random access points through pipeline delay with bounded retries, an
//! audio engine that maps linear PCM positions onto the container's
//! variable frame grid, and mechanical output conversion.
//!
//! ## Quick start
//!
//! ```rust
//! use frameserve::prelude::*;
//! use frameserve::synthetic::{SyntheticContainer, SyntheticVideoTrackSpec};
//! use frameserve_codec::synthetic::SyntheticDecoderFactory;
//! use std::sync::Arc;
//!
//! fn main() -> frameserve::Result<()> {
//!     let container = SyntheticContainer::builder()
//!         .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
//!         .build();
//!     let source = MediaSource::new(Arc::new(SyntheticDecoderFactory::new()));
//!     let mut track = source.open_reader(Box::new(container), TrackSelector::FirstVideo)?;
//!     let frame = track.get_video_frame(45)?;
//!     assert_eq!(frame.width(), 320);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - `frameserve-core`: shared value types and the error hierarchy
//! - `frameserve-demux`: container boundary, sample index, PCM timeline
//! - `frameserve-codec`: codec boundary and configuration management
//! - `frameserve-resample`: sample-accurate resampling
//! - `frameserve-convert`: output format conversion and host sinks
//! - `frameserve-engine`: the access engines and track sessions
//!
//! This crate re-exports the commonly used types and adds the high-level
//! [`MediaSource`] API.

mod options;
mod source;
pub mod prelude;

// Re-export core types
pub use frameserve_core::{
    error::{CodecError, DecodeError, Error, IndexError, Result},
    frame::{ColorRange, ColorSpace, Frame, FrameBuffer, FrameFlags, PixelFormat},
    packet::{OwnedPacket, Packet, PacketFlags},
    rational::Rational,
    sample::{ChannelLayout, Sample, SampleBuffer, SampleFormat},
    timestamp::{Duration, TimeBase, Timestamp},
};

// Re-export boundary traits and index types
pub use frameserve_demux::{
    index::{RapBitmap, SampleDescriptor, SampleIndex},
    timeline::{PcmLocation, PcmRun, PcmTimeline},
    traits::{
        CodecId, ConfigRecord, ContainerOpener, ContainerReader, HandlerType,
        SampleMetadata, SeekBasis, SeekOutcome, SeekRequest, TrackDescription,
    },
};

/// The synthetic in-memory container (tests and demos).
pub use frameserve_demux::synthetic;

// Re-export codec boundary types
pub use frameserve_codec::{
    config::{ConfigEntry, ConfigTable},
    traits::{AudioDecode, DecoderFactory, DecoderRequest, VideoDecode},
    PipelineDelay,
};

// Re-export conversion and resampling types
pub use frameserve_convert::{OutputLayout, OutputSink};
pub use frameserve_resample::{LinearResampler, ResamplerImpl};

// Re-export session API
pub use frameserve_engine::{
    EngineState, SharedTrack, TrackSelector, TrackSession, TrackStats,
};

// High-level API
pub use options::{AudioFormat, SeekMode, SourceOptions, VideoOutput};
pub use source::MediaSource;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string.
pub fn version() -> &'static str {
    VERSION
}
