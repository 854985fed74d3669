//! Prelude module for convenient imports.
//!
//! ```rust
//! use frameserve::prelude::*;
//! ```

// Error and result types
pub use crate::{Error, Result};

// Frame and sample types
pub use crate::{Frame, FrameBuffer, PixelFormat, Sample, SampleBuffer, SampleFormat};

// Timing types
pub use crate::{Duration, Rational, TimeBase, Timestamp};

// Boundary traits
pub use crate::{AudioDecode, ContainerOpener, ContainerReader, DecoderFactory, VideoDecode};

// Session API
pub use crate::{SharedTrack, TrackSelector, TrackSession, TrackStats};

// High-level API
pub use crate::{AudioFormat, MediaSource, SeekMode, SourceOptions, VideoOutput};
