//! # frameserve-demux
//!
//! The container-library boundary and everything built directly on it: the
//! per-track sample index (decode/presentation order converters, the
//! random-access-point bitmap), the linear PCM timeline with cross-rate
//! ceiling accounting, and a scriptable in-memory container used by tests
//! and demos.

pub mod index;
pub mod synthetic;
pub mod timeline;
pub mod traits;

pub use index::{RapBitmap, SampleDescriptor, SampleIndex};
pub use timeline::{PcmLocation, PcmRun, PcmTimeline};
pub use traits::{
    CodecId, ConfigRecord, ContainerOpener, ContainerReader, HandlerType,
    NominalAudioParams, NominalVideoParams, SampleMetadata, SeekBasis, SeekOutcome,
    SeekRequest, TrackDescription,
};
